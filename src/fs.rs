use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub static CWD: LazyLock<PathBuf> =
    LazyLock::new(|| std::env::current_dir().expect("The current directory must exist"));

pub trait Simplified {
    /// Simplify a [`Path`].
    ///
    /// On Windows, this will strip the `\\?\` prefix from paths. On other platforms, it's a no-op.
    fn simplified(&self) -> &Path;

    /// Render a [`Path`] for user-facing display, relative to the current working directory
    /// when possible.
    fn user_display(&self) -> impl Display;
}

impl<T: AsRef<Path>> Simplified for T {
    fn simplified(&self) -> &Path {
        dunce::simplified(self.as_ref())
    }

    fn user_display(&self) -> impl Display {
        let path = dunce::simplified(self.as_ref());

        if CWD.ancestors().nth(1).is_none() {
            return path.display();
        }
        path.strip_prefix(CWD.simplified())
            .unwrap_or(path)
            .display()
    }
}

/// The directory a config file lives in, used as the working directory for its tasks.
pub fn config_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => CWD.clone(),
    }
}
