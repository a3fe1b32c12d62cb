use std::fmt::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::debug;

use constants::env_vars::EnvVars;

use crate::cli::reporter::TaskRunReporter;
use crate::cli::{load_system, ExitStatus};
use maxpar::printer::Printer;
use maxpar::system::Error;
use maxpar::warn_user;

pub(crate) async fn run(
    config: Option<PathBuf>,
    seq: bool,
    jobs: Option<NonZeroUsize>,
    printer: Printer,
) -> Result<ExitStatus> {
    let mut system = load_system(config)?;
    system.set_logging(printer != Printer::Quiet);

    let seq = seq || no_concurrency();
    debug!(tasks = system.len(), seq, ?jobs, "Running task system");

    let reporter = TaskRunReporter::new(printer, system.len());
    let result = if seq {
        system.run_seq(Some(&reporter)).await
    } else {
        system.run_with(jobs, Some(&reporter)).await
    };

    report_outcome(result, printer)
}

fn no_concurrency() -> bool {
    if EnvVars::is_set(EnvVars::MAXPAR_NO_CONCURRENCY) {
        warn_user!(
            "`{}` is set, running tasks sequentially",
            EnvVars::MAXPAR_NO_CONCURRENCY
        );
        return true;
    }
    false
}

/// Turn a task failure into a failing exit status; other errors are unexpected.
pub(super) fn report_outcome(result: Result<(), Error>, printer: Printer) -> Result<ExitStatus> {
    match result {
        Ok(()) => Ok(ExitStatus::Success),
        Err(Error::TaskFailed { name, source }) => {
            writeln!(
                printer.stderr(),
                "{}: Task `{}` failed",
                "error".red().bold(),
                name.cyan()
            )?;
            for cause in source.chain() {
                writeln!(printer.stderr(), "  {}: {}", "caused by".red().bold(), cause)?;
            }
            Ok(ExitStatus::Failure)
        }
        Err(err) => Err(err.into()),
    }
}
