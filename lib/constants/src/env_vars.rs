use std::ffi::OsString;

use tracing::trace;

pub struct EnvVars;

impl EnvVars {
    // Maxpar specific environment variables, public for users
    pub const MAXPAR_CONFIG: &'static str = "MAXPAR_CONFIG";
    pub const MAXPAR_NO_CONCURRENCY: &'static str = "MAXPAR_NO_CONCURRENCY";
    pub const MAXPAR_JOBS: &'static str = "MAXPAR_JOBS";

    // Exported to every command task while it runs
    pub const MAXPAR_TASK: &'static str = "MAXPAR_TASK";
    pub const MAXPAR_WORKER: &'static str = "MAXPAR_WORKER";

    // Maxpar internal environment variables
    pub const MAXPAR_INTERNAL__TEST_DIR: &'static str = "MAXPAR_INTERNAL__TEST_DIR";
}

impl EnvVars {
    pub fn var_os(name: &str) -> Option<OsString> {
        #[allow(clippy::disallowed_methods)]
        let val = std::env::var_os(name);
        if let Some(val) = &val {
            trace!("Read {name}={}", val.to_string_lossy());
        }
        val
    }

    /// Whether the variable is set to something other than empty, `0` or `false`.
    pub fn is_set(name: &str) -> bool {
        Self::var_os(name).is_some_and(|val| !matches!(val.to_str(), Some("" | "0" | "false")))
    }

    pub fn var(name: &str) -> Result<String, std::env::VarError> {
        match Self::var_os(name) {
            Some(s) => s.into_string().map_err(std::env::VarError::NotUnicode),
            None => Err(std::env::VarError::NotPresent),
        }
    }
}
