use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::system::{self, TaskSystem};
use crate::task::Task;

pub const CONFIG_FILE: &str = "maxpar.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigTask {
    pub name: String,
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
    /// Shell command line run for this task.
    pub run: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigWire {
    pub tasks: Vec<ConfigTask>,
    #[serde(default)]
    pub precedence: BTreeMap<String, Vec<String>>,
}

impl ConfigWire {
    pub fn into_system(self) -> Result<TaskSystem, system::Error> {
        let tasks = self.tasks.into_iter().map(|task| {
            let built = Task::new(task.name).reads(task.reads).writes(task.writes);
            match task.run {
                Some(line) => built.command(line),
                None => built,
            }
        });
        TaskSystem::new(tasks, self.precedence)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse: `{0}`")]
    Yaml(String, #[source] serde_yaml::Error),
}

pub fn read_config(path: &Path) -> Result<ConfigWire, Error> {
    let content = fs_err::read_to_string(path)?;
    let config =
        serde_yaml::from_str(&content).map_err(|e| Error::Yaml(path.display().to_string(), e))?;
    Ok(config)
}
