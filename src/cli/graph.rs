use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::{load_system, ExitStatus};
use maxpar::fs::Simplified;
use maxpar::printer::Printer;

pub(crate) fn graph(
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    printer: Printer,
) -> Result<ExitStatus> {
    let system = load_system(config)?;
    let dot = system.to_dot();

    if let Some(output) = output {
        fs_err::write(&output, dot)?;
        writeln!(
            printer.stderr(),
            "Written to `{}`",
            output.user_display().cyan()
        )?;
        return Ok(ExitStatus::Success);
    }

    write!(printer.stdout(), "{dot}")?;
    Ok(ExitStatus::Success)
}
