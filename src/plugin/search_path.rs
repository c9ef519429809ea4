//! Plugin search path
//!
//! A separator-delimited list of directories. A leading `~` expands to
//! the home directory and `%D` expands to the default module directory.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Token replaced by the default module directory
pub const DEFAULT_DIR_TOKEN: &str = "%D";

/// Directory searched when no path is configured
pub fn default_module_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("mode-host").join("modules"))
        .unwrap_or_else(|| PathBuf::from("/usr/lib/mode-host/modules"))
}

/// Ordered list of plugin directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::from_dirs(vec![default_module_dir()])
    }
}

impl SearchPath {
    /// Parse a search path using the real home and default directories
    pub fn parse(spec: impl AsRef<OsStr>) -> Self {
        Self::parse_with(spec, dirs::home_dir().as_deref(), &default_module_dir())
    }

    /// Parse a search path with explicit expansion targets
    ///
    /// `~` is left as is when `home` is `None`. Empty entries are dropped.
    pub fn parse_with(spec: impl AsRef<OsStr>, home: Option<&Path>, default_dir: &Path) -> Self {
        let dirs = env::split_paths(spec.as_ref())
            .filter(|entry| !entry.as_os_str().is_empty())
            .map(|entry| expand(&entry, home, default_dir))
            .collect();
        Self { dirs }
    }

    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

fn expand(entry: &Path, home: Option<&Path>, default_dir: &Path) -> PathBuf {
    let Some(text) = entry.to_str() else {
        return entry.to_path_buf();
    };

    let expanded = if let Some(rest) = text.strip_prefix(DEFAULT_DIR_TOKEN) {
        join_rest(default_dir, rest)
    } else if let (Some(rest), Some(home)) = (text.strip_prefix('~'), home) {
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with(std::path::MAIN_SEPARATOR) {
            join_rest(home, rest)
        } else {
            // `~user` is not expanded
            PathBuf::from(text)
        }
    } else {
        PathBuf::from(text)
    };

    if expanded.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        expanded
    }
}

fn join_rest(base: &Path, rest: &str) -> PathBuf {
    let rest = rest.trim_start_matches(['/', std::path::MAIN_SEPARATOR]);
    if rest.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join(parts: &[&str]) -> std::ffi::OsString {
        env::join_paths(parts).unwrap()
    }

    fn parse(parts: &[&str]) -> Vec<PathBuf> {
        SearchPath::parse_with(
            join(parts),
            Some(Path::new("/home/ana")),
            Path::new("/opt/modes"),
        )
        .dirs()
        .to_vec()
    }

    #[test]
    fn test_plain_entries_keep_order() {
        assert_eq!(
            parse(&["/a", "/b/c"]),
            vec![PathBuf::from("/a"), PathBuf::from("/b/c")]
        );
    }

    #[test]
    fn test_home_expansion() {
        assert_eq!(
            parse(&["~/modes", "~"]),
            vec![PathBuf::from("/home/ana/modes"), PathBuf::from("/home/ana")]
        );
    }

    #[test]
    fn test_tilde_user_is_not_expanded() {
        assert_eq!(parse(&["~bob/modes"]), vec![PathBuf::from("~bob/modes")]);
    }

    #[test]
    fn test_default_dir_token() {
        assert_eq!(
            parse(&["%D", "%D/extra"]),
            vec![PathBuf::from("/opt/modes"), PathBuf::from("/opt/modes/extra")]
        );
    }

    #[test]
    fn test_empty_entries_are_ignored() {
        assert_eq!(parse(&["", "/a", ""]), vec![PathBuf::from("/a")]);
        assert!(SearchPath::parse_with("", None, Path::new("/opt")).is_empty());
    }

    #[test]
    fn test_missing_home_leaves_tilde() {
        let path = SearchPath::parse_with("~/modes", None, Path::new("/opt"));
        assert_eq!(path.dirs(), &[PathBuf::from("~/modes")]);
    }

    #[test]
    fn test_default_is_module_dir() {
        assert_eq!(SearchPath::default().dirs(), &[default_module_dir()]);
        assert!(default_module_dir().ends_with("modules"));
    }
}
