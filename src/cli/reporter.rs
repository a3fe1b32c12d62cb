use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use maxpar::printer::Printer;
use maxpar::scheduler::Reporter;
use maxpar::task::Task;

#[derive(Default, Debug)]
struct BarState {
    /// Progress bars of running tasks, by ID.
    bars: HashMap<usize, ProgressBar>,
    /// A monotonic counter for bar IDs.
    id: usize,
}

impl BarState {
    fn id(&mut self) -> usize {
        self.id += 1;
        self.id
    }
}

/// Prints a line per started task and shows a spinner per running task.
///
/// One reporter may span several runs; the root spinner is cleared on drop.
pub(crate) struct TaskRunReporter {
    printer: Printer,
    root: ProgressBar,
    children: MultiProgress,
    state: Mutex<BarState>,
}

impl TaskRunReporter {
    pub(crate) fn new(printer: Printer, total: usize) -> Self {
        let children = MultiProgress::with_draw_target(printer.target());
        let root = children.add(ProgressBar::with_draw_target(
            u64::try_from(total).ok(),
            printer.target(),
        ));
        root.enable_steady_tick(Duration::from_millis(200));
        root.set_style(
            ProgressStyle::with_template("{spinner:.white} {msg:.dim} {pos}/{len}")
                .expect("valid template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        root.set_message("Running tasks...");

        Self {
            printer,
            root,
            children,
            state: Mutex::default(),
        }
    }
}

impl Reporter for TaskRunReporter {
    fn on_task_start(&self, task: &Task, slot: usize) -> usize {
        self.children.suspend(|| {
            let _ = writeln!(
                self.printer.stdout(),
                "{} {} on worker {slot} ...",
                "Running".bold().cyan(),
                task.name,
            );
        });

        let progress = self.children.insert_before(
            &self.root,
            ProgressBar::with_draw_target(None, self.printer.target()),
        );
        progress.set_style(ProgressStyle::with_template("{wide_msg}").expect("valid template"));
        progress.set_message(format!("{} {}", task.name.bold(), "running".dimmed()));

        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = state.id();
        state.bars.insert(id, progress);
        id
    }

    fn on_task_complete(&self, id: usize, _task: &Task, _elapsed: Duration) {
        let progress = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .bars
            .remove(&id);

        self.root.inc(1);
        if let Some(progress) = progress {
            progress.finish_and_clear();
        }
    }

    fn on_complete(&self) {
        let bars: Vec<_> = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .bars
            .drain()
            .map(|(_, bar)| bar)
            .collect();
        for bar in bars {
            bar.finish_and_clear();
        }
    }
}

impl Drop for TaskRunReporter {
    fn drop(&mut self) {
        self.root.set_message("");
        self.root.finish_and_clear();
    }
}
