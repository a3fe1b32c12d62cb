use std::collections::BTreeSet;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// A closure executed in-process on the blocking thread pool.
pub type TaskFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// What a [`Task`] does when it runs.
#[derive(Clone, Default)]
pub enum Action {
    #[default]
    Noop,
    Func(TaskFn),
    /// A shell command line.
    Command(String),
}

impl Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Noop => write!(f, "Noop"),
            Action::Func(_) => write!(f, "Func(..)"),
            Action::Command(line) => f.debug_tuple("Command").field(line).finish(),
        }
    }
}

/// A unit of work together with the shared variables it reads and writes.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
    pub action: Action,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reads: BTreeSet::new(),
            writes: BTreeSet::new(),
            action: Action::Noop,
        }
    }

    #[must_use]
    pub fn reads<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(vars.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn writes<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.writes.extend(vars.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn run<F>(mut self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.action = Action::Func(Arc::new(f));
        self
    }

    #[must_use]
    pub fn command(mut self, line: impl Into<String>) -> Self {
        self.action = Action::Command(line.into());
        self
    }

    /// Whether the two tasks may not run at the same time.
    ///
    /// Two tasks interfere when one of them writes a variable the other reads or writes.
    pub fn interferes(&self, other: &Task) -> bool {
        !self.reads.is_disjoint(&other.writes)
            || !self.writes.is_disjoint(&other.reads)
            || !self.writes.is_disjoint(&other.writes)
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
