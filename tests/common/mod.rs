#![allow(dead_code, unreachable_pub)]

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_fs::fixture::{ChildPath, PathChild};
use etcetera::BaseStrategy;

/// The demo task system, without the sleeps.
pub const EXAMPLE_CONFIG: &str = indoc::indoc! {r#"
    tasks:
      - name: T1
        writes: [X]
        run: echo 5 > X
      - name: T2
        writes: [Y]
        run: echo 3 > Y
      - name: T3
        reads: [X, Y]
        writes: [X, Y]
        run: x=$(cat X) && y=$(cat Y) && echo $((x * x)) > X && echo $((y * y)) > Y
      - name: T4
        writes: [Z]
        run: echo 10 > Z
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
"#};

pub struct TestContext {
    temp_dir: ChildPath,

    /// Standard filters for this test context.
    filters: Vec<(String, String)>,

    // To keep the directory alive.
    #[allow(dead_code)]
    _root: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let bucket = Self::test_bucket_dir();
        fs_err::create_dir_all(&bucket).expect("Failed to create test bucket");

        let root = tempfile::TempDir::new_in(bucket).expect("Failed to create test root directory");

        let temp_dir = ChildPath::new(root.path()).child("temp");
        fs_err::create_dir_all(&temp_dir).expect("Failed to create test working directory");

        let filters = Self::path_patterns(&temp_dir)
            .into_iter()
            .map(|pattern| (pattern, "[TEMP_DIR]/".to_string()))
            .collect();

        Self {
            temp_dir,
            filters,
            _root: root,
        }
    }

    pub fn test_bucket_dir() -> PathBuf {
        env::var("MAXPAR_INTERNAL__TEST_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                etcetera::base_strategy::choose_base_strategy()
                    .expect("Failed to find base strategy")
                    .data_dir()
                    .join("maxpar")
                    .join("tests")
            })
    }

    /// Generate an escaped regex pattern for the given path.
    fn path_pattern(path: impl AsRef<Path>) -> String {
        format!(
            // Trim the trailing separator for cross-platform directories filters
            r"{}\\?/?",
            regex::escape(&path.as_ref().display().to_string())
                // Make separators platform agnostic because on Windows we will display
                // paths with Unix-style separators sometimes
                .replace(r"\\", r"(\\|\/)")
        )
    }

    /// Generate various escaped regex patterns for the given path.
    pub fn path_patterns(path: impl AsRef<Path>) -> Vec<String> {
        let mut patterns = Vec::new();

        // We can only canonicalize paths that exist already
        if path.as_ref().exists() {
            patterns.push(Self::path_pattern(
                path.as_ref()
                    .canonicalize()
                    .expect("Failed to create canonical path"),
            ));
        }

        // Include a non-canonicalized version
        patterns.push(Self::path_pattern(path));

        patterns
    }

    /// Read a file in the temporary directory
    pub fn read(&self, file: impl AsRef<Path>) -> String {
        fs_err::read_to_string(self.temp_dir.join(&file))
            .unwrap_or_else(|_| panic!("Missing file: `{}`", file.as_ref().display()))
    }

    /// Write `maxpar.yaml` in the working directory.
    pub fn write_config(&self, content: &str) {
        fs_err::write(self.temp_dir.child("maxpar.yaml"), content)
            .expect("Failed to write config file");
    }

    pub fn command(&self) -> Command {
        let bin = assert_cmd::cargo::cargo_bin("maxpar");
        let mut cmd = Command::new(bin);
        cmd.current_dir(self.workdir());
        cmd.env_remove("MAXPAR_CONFIG");
        cmd.env_remove("MAXPAR_JOBS");
        cmd.env_remove("MAXPAR_NO_CONCURRENCY");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn run(&self) -> Command {
        let mut command = self.command();
        command.arg("run");
        command
    }

    pub fn par_cost(&self) -> Command {
        let mut command = self.command();
        command.arg("par-cost");
        command
    }

    pub fn deps(&self) -> Command {
        let mut command = self.command();
        command.arg("deps");
        command
    }

    pub fn order(&self) -> Command {
        let mut command = self.command();
        command.arg("order");
        command
    }

    pub fn graph(&self) -> Command {
        let mut command = self.command();
        command.arg("graph");
        command
    }

    pub fn validate(&self) -> Command {
        let mut command = self.command();
        command.arg("validate");
        command
    }

    pub fn sample_config(&self) -> Command {
        let mut command = self.command();
        command.arg("sample-config");
        command
    }

    /// Standard snapshot filters _plus_ those for this test context.
    pub fn filters(&self) -> Vec<(&str, &str)> {
        // Put test context snapshots before the default filters
        // This ensures we don't replace other patterns inside paths from the test context first
        self.filters
            .iter()
            .map(|(p, r)| (p.as_str(), r.as_str()))
            .chain(INSTA_FILTERS.iter().copied())
            .collect()
    }

    /// Get the working directory for the test context.
    pub fn workdir(&self) -> &ChildPath {
        &self.temp_dir
    }
}

#[doc(hidden)] // Macro and test context only, don't use directly.
pub const INSTA_FILTERS: &[(&str, &str)] = &[
    // Timings
    (r"\d+\.\d{4} seconds", "[TIME] seconds"),
    (r"Speedup: \d+\.\d{2}", "Speedup: [SPEEDUP]"),
    // Rewrite Windows output to Unix output
    (r"\\([\w\d]|\.\.)", "/$1"),
    (r"maxpar.exe", "maxpar"),
];

#[allow(unused_macros)]
macro_rules! cmd_snapshot {
    ($spawnable:expr, @$snapshot:literal) => {{
        cmd_snapshot!($crate::common::INSTA_FILTERS.iter().copied().collect::<Vec<_>>(), $spawnable, @$snapshot)
    }};
    ($filters:expr, $spawnable:expr, @$snapshot:literal) => {{
        let mut settings = insta::Settings::clone_current();
        for (matcher, replacement) in $filters {
            settings.add_filter(matcher, replacement);
        }
        let _guard = settings.bind_to_scope();
        insta_cmd::assert_cmd_snapshot!($spawnable, @$snapshot);
    }};
}

#[allow(unused_imports)]
pub(crate) use cmd_snapshot;
