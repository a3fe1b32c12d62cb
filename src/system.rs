use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::task::Task;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Task `{0}` not found in the list of tasks")]
    TaskNotFound(String),

    #[error("Duplicate task found: `{0}`")]
    DuplicateTask(String),

    #[error("Task `{0}` has no precedence entry")]
    NoTaskPrecedence(String),

    #[error("Invalid precedence graph")]
    InvalidPrecedence(#[from] PrecedenceError),

    #[error("Task `{name}` failed")]
    TaskFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum PrecedenceError {
    #[error("Task `{0}` cannot depend on itself")]
    SelfDependency(String),

    #[error("Task `{task}` depends on unknown task `{dependency}`")]
    UnknownDependency { task: String, dependency: String },

    #[error("Precedence graph contains a cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// A validated set of tasks and the precedence constraints between them.
#[derive(Debug)]
pub struct TaskSystem {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    /// Direct predecessors of every task.
    precedence: HashMap<String, Vec<String>>,
    logging: bool,
    workdir: Option<PathBuf>,
}

impl TaskSystem {
    /// Build a task system, checking that every task has exactly one precedence entry and that
    /// the precedence graph is acyclic.
    pub fn new<T, P, K, V, S>(tasks: T, precedence: P) -> Result<Self, Error>
    where
        T: IntoIterator<Item = Task>,
        P: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let precedence: HashMap<String, Vec<String>> = precedence
            .into_iter()
            .map(|(task, deps)| (task.into(), deps.into_iter().map(Into::into).collect()))
            .collect();

        let mut index = HashMap::new();
        let mut ordered = Vec::new();
        for task in tasks {
            if !precedence.contains_key(&task.name) {
                return Err(Error::NoTaskPrecedence(task.name));
            }
            if index.contains_key(&task.name) {
                return Err(Error::DuplicateTask(task.name));
            }
            index.insert(task.name.clone(), ordered.len());
            ordered.push(task);
        }

        let mut names: Vec<_> = precedence.keys().collect();
        names.sort_unstable();
        if let Some(name) = names.into_iter().find(|name| !index.contains_key(*name)) {
            return Err(Error::TaskNotFound(name.clone()));
        }

        let system = Self {
            tasks: ordered,
            index,
            precedence,
            logging: true,
            workdir: None,
        };
        system.validate_precedence()?;

        debug!(tasks = system.tasks.len(), "Validated task system");
        Ok(system)
    }

    fn validate_precedence(&self) -> Result<(), PrecedenceError> {
        for task in &self.tasks {
            for dep in &self.precedence[&task.name] {
                if *dep == task.name {
                    return Err(PrecedenceError::SelfDependency(task.name.clone()));
                }
                if !self.index.contains_key(dep) {
                    return Err(PrecedenceError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut marks = HashMap::new();
        for task in &self.tasks {
            if let Some(cycle) = self.find_cycle(&task.name, &mut marks) {
                return Err(PrecedenceError::Cycle(cycle));
            }
        }
        Ok(())
    }

    /// Depth-first search along "depends on" edges. `marks` holds `false` while a task is on the
    /// stack and `true` once it is fully explored.
    fn find_cycle<'a>(
        &'a self,
        root: &'a str,
        marks: &mut HashMap<&'a str, bool>,
    ) -> Option<Vec<String>> {
        if marks.contains_key(root) {
            return None;
        }
        marks.insert(root, false);

        // Each frame holds a task and the index of its next predecessor.
        let mut stack = vec![(root, 0)];
        while let Some((name, next)) = stack.last_mut() {
            let name = *name;
            let Some(dep) = self.predecessors(name).get(*next) else {
                marks.insert(name, true);
                stack.pop();
                continue;
            };
            *next += 1;

            match marks.get(dep.as_str()).copied() {
                Some(true) => {}
                Some(false) => {
                    let start = stack.iter().position(|(n, _)| *n == dep.as_str())?;
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| (*n).to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                None => {
                    marks.insert(dep.as_str(), false);
                    stack.push((dep.as_str(), 0));
                }
            }
        }
        None
    }

    /// Tasks in the order they were given.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&idx| &self.tasks[idx])
    }

    pub fn precedence(&self) -> &HashMap<String, Vec<String>> {
        &self.precedence
    }

    /// Direct predecessors of a known task.
    pub(crate) fn predecessors(&self, name: &str) -> &[String] {
        self.precedence.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Enable or disable progress reporting while running.
    pub fn set_logging(&mut self, state: bool) {
        self.logging = state;
    }

    pub fn logging(&self) -> bool {
        self.logging
    }

    /// Directory command tasks run in. Defaults to the current directory.
    #[must_use]
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    /// All tasks that must complete before `name` may start, in depth-first post-order.
    pub fn get_dependencies(&self, name: &str) -> Result<Vec<&str>, Error> {
        let task = self
            .task(name)
            .ok_or_else(|| Error::TaskNotFound(name.to_string()))?;

        let mut visited = HashSet::new();
        let mut dependencies = Vec::new();
        self.collect(&task.name, &mut visited, &mut dependencies);
        // The task itself always comes last.
        dependencies.pop();

        trace!(task = name, ?dependencies, "Resolved dependencies");
        Ok(dependencies)
    }

    /// Push `root` and its transitive predecessors to `out` in post-order, skipping visited tasks.
    fn collect<'a>(&'a self, root: &'a str, visited: &mut HashSet<&'a str>, out: &mut Vec<&'a str>) {
        if !visited.insert(root) {
            return;
        }

        let mut stack = vec![(root, 0)];
        while let Some((name, next)) = stack.last_mut() {
            let name = *name;
            match self.predecessors(name).get(*next) {
                Some(dep) => {
                    *next += 1;
                    if visited.insert(dep.as_str()) {
                        stack.push((dep.as_str(), 0));
                    }
                }
                None => {
                    out.push(name);
                    stack.pop();
                }
            }
        }
    }

    /// The order in which [`TaskSystem::run_seq`] executes tasks.
    pub fn sequence(&self) -> Vec<&Task> {
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            self.collect(&task.name, &mut visited, &mut order);
        }
        order
            .into_iter()
            .map(|name| &self.tasks[self.index[name]])
            .collect()
    }

    /// Render the precedence graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        fn quote(name: &str) -> String {
            format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
        }

        let mut dot = String::from("digraph maxpar {\n");
        for task in &self.tasks {
            let _ = writeln!(dot, "    {};", quote(&task.name));
        }
        for task in &self.tasks {
            for dep in self.predecessors(&task.name) {
                let _ = writeln!(dot, "    {} -> {};", quote(dep), quote(&task.name));
            }
        }
        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn example_tasks() -> Vec<Task> {
        vec![
            Task::new("T1").writes(["X"]),
            Task::new("T2").writes(["Y"]),
            Task::new("T3").reads(["X", "Y"]).writes(["X", "Y"]),
            Task::new("T4").writes(["Z"]),
            Task::new("T5").reads(["X", "Y", "Z"]).writes(["Z"]),
            Task::new("T6").reads(["Z"]).writes(["Z"]),
        ]
    }

    pub(crate) fn example_precedence() -> Vec<(&'static str, Vec<&'static str>)> {
        vec![
            ("T1", vec![]),
            ("T2", vec![]),
            ("T3", vec!["T1", "T2"]),
            ("T4", vec![]),
            ("T5", vec!["T3", "T4"]),
            ("T6", vec!["T5"]),
        ]
    }

    fn with_precedence(
        changes: &[(&'static str, Vec<&'static str>)],
    ) -> Vec<(&'static str, Vec<&'static str>)> {
        let mut precedence = example_precedence();
        for (task, deps) in changes {
            match precedence.iter_mut().find(|(name, _)| name == task) {
                Some(entry) => entry.1.clone_from(deps),
                None => precedence.push((*task, deps.clone())),
            }
        }
        precedence
    }

    #[test]
    fn constructor() -> anyhow::Result<()> {
        let system = TaskSystem::new(example_tasks(), example_precedence())?;

        let names: Vec<_> = system.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["T1", "T2", "T3", "T4", "T5", "T6"]);
        assert_eq!(system.precedence().len(), 6);
        assert_eq!(system.precedence()["T5"], ["T3", "T4"]);
        assert!(system.task("T4").is_some());
        assert!(system.task("T7").is_none());
        assert!(system.logging());
        Ok(())
    }

    #[test]
    fn task_not_found() {
        let mut tasks = example_tasks();
        tasks.pop();
        let err = TaskSystem::new(tasks, example_precedence()).unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(ref name) if name == "T6"));
    }

    #[test]
    fn unknown_precedence_keys_are_reported_in_order() {
        let precedence = with_precedence(&[("Z9", vec![]), ("A9", vec![])]);
        let err = TaskSystem::new(example_tasks(), precedence).unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(ref name) if name == "A9"));
    }

    /// Every task depends on the one before it.
    fn chain(names: &[String]) -> Vec<(&str, Vec<&str>)> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let deps = names[..i].last().map(String::as_str).into_iter().collect();
                (name.as_str(), deps)
            })
            .collect()
    }

    #[test]
    fn long_chain() -> anyhow::Result<()> {
        const LEN: usize = 50_000;

        let names: Vec<String> = (0..LEN).map(|i| format!("T{i}")).collect();
        let system = TaskSystem::new(names.iter().map(Task::new), chain(&names))?;

        let last = &names[LEN - 1];
        let dependencies = system.get_dependencies(last)?;
        assert_eq!(dependencies.len(), LEN - 1);
        assert_eq!(dependencies.first(), Some(&"T0"));
        assert_eq!(system.sequence().len(), LEN);

        let mut precedence = chain(&names);
        precedence[0].1.push(last.as_str());
        let err = TaskSystem::new(names.iter().map(Task::new), precedence).unwrap_err();
        let Error::InvalidPrecedence(PrecedenceError::Cycle(cycle)) = &err else {
            panic!("expected a cycle, got {err:?}");
        };
        assert_eq!(cycle.len(), LEN + 1);
        Ok(())
    }

    #[test]
    fn duplicate_task() {
        let mut tasks = example_tasks();
        tasks.push(Task::new("T1"));
        let err = TaskSystem::new(tasks, example_precedence()).unwrap_err();
        assert!(matches!(err, Error::DuplicateTask(ref name) if name == "T1"));
    }

    #[test]
    fn no_task_precedence() {
        let precedence: Vec<_> = example_precedence()
            .into_iter()
            .filter(|(name, _)| *name != "T1")
            .collect();
        let err = TaskSystem::new(example_tasks(), precedence).unwrap_err();
        assert!(matches!(err, Error::NoTaskPrecedence(ref name) if name == "T1"));
    }

    #[test]
    fn self_dependency() {
        let err =
            TaskSystem::new(example_tasks(), with_precedence(&[("T1", vec!["T1"])])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPrecedence(PrecedenceError::SelfDependency(ref name)) if name == "T1"
        ));
    }

    #[test]
    fn unknown_dependency() {
        let err =
            TaskSystem::new(example_tasks(), with_precedence(&[("T2", vec!["T9"])])).unwrap_err();
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("Task `T2` depends on unknown task `T9`".to_string())
        );
    }

    #[test]
    fn cycle() {
        let precedence = with_precedence(&[
            ("T1", vec!["T2"]),
            ("T2", vec!["T3"]),
            ("T3", vec!["T1"]),
        ]);
        let err = TaskSystem::new(example_tasks(), precedence).unwrap_err();
        let Error::InvalidPrecedence(PrecedenceError::Cycle(cycle)) = &err else {
            panic!("expected a cycle, got {err:?}");
        };
        assert_eq!(cycle, &["T1", "T2", "T3", "T1"]);
        insta::assert_snapshot!(
            std::error::Error::source(&err).unwrap(),
            @"Precedence graph contains a cycle: T1 -> T2 -> T3 -> T1"
        );
    }

    #[test]
    fn get_dependencies() -> anyhow::Result<()> {
        let system = TaskSystem::new(example_tasks(), example_precedence())?;

        assert!(system.get_dependencies("T1")?.is_empty());
        assert!(system.get_dependencies("T2")?.is_empty());
        assert_eq!(system.get_dependencies("T3")?, ["T1", "T2"]);
        assert!(system.get_dependencies("T4")?.is_empty());
        assert_eq!(system.get_dependencies("T5")?, ["T1", "T2", "T3", "T4"]);
        assert_eq!(system.get_dependencies("T6")?, ["T1", "T2", "T3", "T4", "T5"]);
        Ok(())
    }

    #[test]
    fn get_dependencies_of_unknown_task() -> anyhow::Result<()> {
        let system = TaskSystem::new(example_tasks(), example_precedence())?;
        let err = system.get_dependencies("unknown_task").unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(ref name) if name == "unknown_task"));
        Ok(())
    }

    #[test]
    fn shared_dependencies_are_listed_once() -> anyhow::Result<()> {
        let tasks = ["A", "B", "C", "D"].map(Task::new);
        let system = TaskSystem::new(
            tasks,
            [
                ("A", vec![]),
                ("B", vec!["A"]),
                ("C", vec!["A"]),
                ("D", vec!["B", "C"]),
            ],
        )?;
        assert_eq!(system.get_dependencies("D")?, ["A", "B", "C"]);
        Ok(())
    }

    #[test]
    fn sequence_follows_precedence() -> anyhow::Result<()> {
        // Input order is shuffled; dependencies still come first.
        let tasks = example_tasks();
        let shuffled: Vec<_> = [4, 2, 5, 3, 1, 0]
            .iter()
            .map(|&i| tasks[i].clone())
            .collect();

        let system = TaskSystem::new(shuffled, example_precedence())?;
        let sequence: Vec<_> = system.sequence().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(sequence, ["T1", "T2", "T3", "T4", "T5", "T6"]);
        Ok(())
    }

    #[test]
    fn dot() -> anyhow::Result<()> {
        let system = TaskSystem::new(example_tasks(), example_precedence())?;
        insta::assert_snapshot!(system.to_dot(), @r#"
        digraph maxpar {
            "T1";
            "T2";
            "T3";
            "T4";
            "T5";
            "T6";
            "T1" -> "T3";
            "T2" -> "T3";
            "T3" -> "T5";
            "T4" -> "T5";
            "T5" -> "T6";
        }
        "#);
        Ok(())
    }
}
