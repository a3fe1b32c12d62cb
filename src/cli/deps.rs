use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::{load_system, ExitStatus};
use maxpar::printer::Printer;
use maxpar::system::Error;

pub(crate) fn deps(config: Option<PathBuf>, task: &str, printer: Printer) -> Result<ExitStatus> {
    let system = load_system(config)?;

    let dependencies = match system.get_dependencies(task) {
        Ok(dependencies) => dependencies,
        Err(Error::TaskNotFound(name)) => {
            writeln!(
                printer.stderr(),
                "{}: Task `{}` not found",
                "error".red().bold(),
                name.cyan()
            )?;
            return Ok(ExitStatus::Failure);
        }
        Err(err) => return Err(err.into()),
    };

    let mut stdout = printer.stdout();
    for name in dependencies {
        writeln!(stdout, "{name}")?;
    }
    Ok(ExitStatus::Success)
}

pub(crate) fn order(config: Option<PathBuf>, printer: Printer) -> Result<ExitStatus> {
    let system = load_system(config)?;

    let mut stdout = printer.stdout();
    for task in system.sequence() {
        writeln!(stdout, "{task}")?;
    }
    Ok(ExitStatus::Success)
}
