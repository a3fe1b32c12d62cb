//! Build task systems from tasks and their precedence constraints, and run them either
//! sequentially or with maximal parallelism.
//!
//! Each [`Task`] declares the shared variables it reads and writes. Two tasks interfere when one
//! writes a variable the other reads or writes; interfering tasks never run at the same time.

pub mod config;
pub mod fs;
pub mod printer;
pub mod process;
pub mod scheduler;
pub mod system;
pub mod task;
pub mod warnings;

pub use config::{read_config, ConfigTask, ConfigWire, CONFIG_FILE};
pub use printer::Printer;
pub use scheduler::{ParCost, Reporter};
pub use system::{Error, PrecedenceError, TaskSystem};
pub use task::{Action, Task, TaskFn};
