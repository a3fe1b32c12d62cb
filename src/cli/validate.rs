use std::error::Error;
use std::fmt::Write;
use std::iter;
use std::path::{Path, PathBuf};

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::ExitStatus;
use maxpar::config::{read_config, CONFIG_FILE};
use maxpar::fs::Simplified;
use maxpar::printer::Printer;

pub(crate) fn validate(config: Option<PathBuf>, printer: Printer) -> Result<ExitStatus> {
    let path = config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    match check(&path) {
        Ok(count) => {
            writeln!(
                printer.stdout(),
                "Task system `{}` is valid ({count} tasks)",
                path.user_display().cyan()
            )?;
            Ok(ExitStatus::Success)
        }
        Err(err) => {
            let mut stderr = printer.stderr();
            writeln!(stderr, "{}: {}", "error".red().bold(), err)?;
            for source in iter::successors(err.source(), |&err| err.source()) {
                writeln!(stderr, "  {}: {}", "caused by".red().bold(), source)?;
            }
            Ok(ExitStatus::Failure)
        }
    }
}

fn check(path: &Path) -> Result<usize, Box<dyn Error>> {
    let system = read_config(path)?.into_system()?;
    Ok(system.len())
}
