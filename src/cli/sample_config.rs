use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cli::ExitStatus;
use maxpar::fs::Simplified;
use maxpar::printer::Printer;

static SAMPLE_CONFIG: &str = r#"# Each task declares the shared variables it reads and writes.
# Tasks that do not interfere with each other run in parallel.
tasks:
  - name: T1
    writes: [X]
    run: sleep 1 && echo 5 > X
  - name: T2
    writes: [Y]
    run: sleep 1 && echo 3 > Y
  - name: T3
    reads: [X, Y]
    writes: [X, Y]
    run: x=$(cat X) && y=$(cat Y) && echo $((x * x)) > X && echo $((y * y)) > Y
  - name: T4
    writes: [Z]
    run: sleep 2 && echo 10 > Z
  - name: T5
    reads: [X, Y, Z]
    writes: [Z]
    run: echo $(($(cat Z) + $(cat X) + $(cat Y))) > Z
  - name: T6
    reads: [Z]
    writes: [Z]
    run: echo $(($(cat Z) + 5)) > Z && echo "Result = $(cat Z)"
precedence:
  T1: []
  T2: []
  T3: [T1, T2]
  T4: []
  T5: [T3, T4]
  T6: [T5]
"#;

pub(crate) fn sample_config(file: Option<PathBuf>, printer: Printer) -> Result<ExitStatus> {
    if let Some(file) = file {
        fs_err::create_dir_all(file.parent().unwrap_or(Path::new(".")))?;
        if file.exists() {
            anyhow::bail!("File `{}` already exists", file.user_display().cyan());
        }
        fs_err::write(&file, SAMPLE_CONFIG)?;

        writeln!(
            printer.stdout(),
            "Written to `{}`",
            file.user_display().cyan()
        )?;

        return Ok(ExitStatus::Success);
    }

    write!(printer.stdout(), "{SAMPLE_CONFIG}")?;
    Ok(ExitStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maxpar::config::ConfigWire;

    #[test]
    fn sample_config_is_valid() -> anyhow::Result<()> {
        let config: ConfigWire = serde_yaml::from_str(SAMPLE_CONFIG)?;
        let system = config.into_system()?;
        assert_eq!(system.len(), 6);
        assert_eq!(system.get_dependencies("T6")?, ["T1", "T2", "T3", "T4", "T5"]);
        Ok(())
    }
}
