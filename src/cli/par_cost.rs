use std::fmt::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::reporter::TaskRunReporter;
use crate::cli::run::report_outcome;
use crate::cli::{load_system, ExitStatus};
use maxpar::printer::Printer;

pub(crate) async fn par_cost(
    config: Option<PathBuf>,
    jobs: Option<NonZeroUsize>,
    printer: Printer,
) -> Result<ExitStatus> {
    let mut system = load_system(config)?;
    system.set_logging(printer != Printer::Quiet);

    let reporter = TaskRunReporter::new(printer, system.len() * 2);
    let cost = match system.par_cost(jobs, Some(&reporter)).await {
        Ok(cost) => cost,
        Err(err) => return report_outcome(Err(err), printer),
    };
    drop(reporter);

    let mut stdout = printer.stdout();
    writeln!(
        stdout,
        "{} {:.4} seconds",
        "Sequential execution time:".bold(),
        cost.sequential.as_secs_f64()
    )?;
    writeln!(
        stdout,
        "{} {:.4} seconds",
        "Parallel execution time:".bold(),
        cost.parallel.as_secs_f64()
    )?;
    writeln!(stdout, "{} {:.2}", "Speedup:".bold(), cost.speedup())?;

    Ok(ExitStatus::Success)
}
