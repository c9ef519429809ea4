//! Plugin discovery
//!
//! Scans every directory of a search path for plugin images, resolves
//! each one and assembles the sorted registry. Failures are reported per
//! file and never stop the scan.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ImageOpener, LibraryOpener, PluginError, PluginImage, SearchPath};
use crate::modes::{ModeDescriptor, ModeRegistry};

/// Program name used as the diagnostic prefix
pub const PROGRAM_NAME: &str = "mode-host";

/// File extension of plugin images
pub const DEFAULT_PLUGIN_SUFFIX: &str = "plug";

/// One candidate that did not make it into the registry
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: PluginError,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadModule: {}: {}", self.path.display(), self.error)
    }
}

/// Result of a scan
#[derive(Debug)]
pub struct LoadReport {
    pub registry: ModeRegistry,
    pub failures: Vec<LoadFailure>,
}

/// Builds a registry from plugin images on a search path
pub struct PluginLoader<O = LibraryOpener> {
    opener: O,
    suffix: String,
    program: String,
}

impl Default for PluginLoader<LibraryOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginLoader<LibraryOpener> {
    /// Loader opening shared libraries
    pub fn new() -> Self {
        Self::with_opener(LibraryOpener)
    }
}

impl<O: ImageOpener> PluginLoader<O> {
    pub fn with_opener(opener: O) -> Self {
        Self {
            opener,
            suffix: DEFAULT_PLUGIN_SUFFIX.to_string(),
            program: PROGRAM_NAME.to_string(),
        }
    }

    /// Set the file extension candidates must carry
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the diagnostic line prefix
    pub fn program_name(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Scan the search path, writing diagnostics to stderr
    pub fn load(&self, path: &SearchPath) -> LoadReport {
        let stderr = io::stderr();
        let mut lock = stderr.lock();
        self.load_with_diagnostics(path, &mut lock)
    }

    /// Scan the search path, writing one diagnostic line per failure to `out`
    pub fn load_with_diagnostics(&self, path: &SearchPath, out: &mut dyn Write) -> LoadReport {
        let mut scan = Scan::default();

        for dir in path.dirs() {
            match self.candidates(dir) {
                Ok(files) => {
                    tracing::debug!(dir = %dir.display(), candidates = files.len(), "Scanning plugin directory");
                    for file in files {
                        self.load_one(&file, &mut scan, out);
                    }
                }
                Err(e) => {
                    self.report(
                        LoadFailure {
                            path: dir.clone(),
                            error: PluginError::UnreadableDirectory(e),
                        },
                        &mut scan,
                        out,
                    );
                }
            }
        }

        let loaded = scan.descriptors.len();
        let failed = scan.failures.len();
        let registry = ModeRegistry::from_parts(scan.descriptors, scan.images);
        if registry.is_empty() {
            tracing::warn!(failed, "No modes loaded from search path");
        } else {
            tracing::info!(loaded, failed, "Plugin scan complete");
        }

        LoadReport {
            registry,
            failures: scan.failures,
        }
    }

    /// Files in `dir` carrying the plugin suffix, in name order
    fn candidates(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry_path(dir, entry))
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == self.suffix.as_str()) && !path.is_dir()
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn load_one(&self, path: &Path, scan: &mut Scan, out: &mut dyn Write) {
        let descriptor = self
            .opener
            .open(path)
            .and_then(|image| {
                let descriptor = Arc::clone(&image).resolve()?;
                Ok((descriptor, image))
            })
            .and_then(|(descriptor, image)| {
                match scan.origins.get(descriptor.name()) {
                    Some(first) => Err(PluginError::DuplicateMode {
                        name: descriptor.name().to_string(),
                        first: first.clone(),
                    }),
                    None => Ok((descriptor, image)),
                }
            });

        match descriptor {
            Ok((descriptor, image)) => {
                tracing::debug!(path = %path.display(), mode = %descriptor.name(), "Loaded mode");
                scan.origins
                    .insert(descriptor.name().to_string(), path.to_path_buf());
                scan.descriptors.push(descriptor);
                scan.images.push(image);
            }
            Err(error) => self.report(
                LoadFailure {
                    path: path.to_path_buf(),
                    error,
                },
                scan,
                out,
            ),
        }
    }

    fn report(&self, failure: LoadFailure, scan: &mut Scan, out: &mut dyn Write) {
        tracing::warn!(path = %failure.path.display(), error = %failure.error, "Plugin load failed");
        if let Err(e) = writeln!(out, "{}: {}", self.program, failure) {
            tracing::debug!("Failed to write load diagnostic: {}", e);
        }
        scan.failures.push(failure);
    }
}

/// Accumulated scan state
#[derive(Default)]
struct Scan {
    descriptors: Vec<ModeDescriptor>,
    images: Vec<Arc<dyn PluginImage>>,
    /// Mode name to the image that first provided it
    origins: HashMap<String, PathBuf>,
    failures: Vec<LoadFailure>,
}

/// Path of a directory entry, logging entries that cannot be read
fn entry_path(dir: &Path, entry: io::Result<fs::DirEntry>) -> Option<PathBuf> {
    match entry {
        Ok(entry) => Some(entry.path()),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), "Skipping unreadable directory entry: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{ModeHooks, ModeInfo};

    struct Idle;

    impl ModeHooks for Idle {
        fn init(&self, _mi: &mut ModeInfo) {}
        fn step(&self, _mi: &mut ModeInfo) {}
    }

    /// Image whose mode name is the file stem; stems starting with `bad`
    /// fail to resolve
    struct StemImage {
        stem: String,
    }

    impl PluginImage for StemImage {
        fn resolve(self: Arc<Self>) -> Result<ModeDescriptor, PluginError> {
            if self.stem.starts_with("bad") {
                return Err(PluginError::Symbol(
                    "required hook `init` is not exported".to_string(),
                ));
            }
            let name = self.stem.trim_end_matches(char::is_numeric).to_string();
            Ok(ModeDescriptor::new(name, "test mode", Idle))
        }
    }

    struct StemOpener;

    impl ImageOpener for StemOpener {
        fn open(&self, path: &Path) -> Result<Arc<dyn PluginImage>, PluginError> {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            if stem.starts_with("locked") {
                return Err(PluginError::Open("permission denied".to_string()));
            }
            Ok(Arc::new(StemImage { stem }))
        }
    }

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn load(path: &SearchPath) -> (LoadReport, String) {
        let mut out = Vec::new();
        let report = PluginLoader::with_opener(StemOpener).load_with_diagnostics(path, &mut out);
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_only_suffixed_files_are_candidates() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "swirl.plug");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "plug");
        fs::create_dir(dir.path().join("nested.plug")).unwrap();

        let (report, diagnostics) = load(&SearchPath::from_dirs(vec![dir.path().to_path_buf()]));

        assert_eq!(report.registry.names().collect::<Vec<_>>(), vec!["swirl"]);
        assert!(diagnostics.is_empty());
        assert_eq!(report.registry.image_count(), 1);
    }

    #[test]
    fn test_failures_are_reported_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "worm.plug");
        touch(dir.path(), "bad.plug");
        touch(dir.path(), "locked.plug");

        let (report, diagnostics) = load(&SearchPath::from_dirs(vec![dir.path().to_path_buf()]));

        assert_eq!(report.registry.count(), 1);
        assert_eq!(report.failures.len(), 2);
        let lines: Vec<_> = diagnostics.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("mode-host: LoadModule: "));
        assert!(lines[0].ends_with("bad.plug: required hook `init` is not exported"));
        assert!(lines[1].ends_with("locked.plug: cannot open image: permission denied"));
    }

    #[test]
    fn test_unreadable_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "worm.plug");
        let missing = dir.path().join("missing");

        let (report, diagnostics) = load(&SearchPath::from_dirs(vec![
            missing.clone(),
            dir.path().to_path_buf(),
        ]));

        assert_eq!(report.registry.count(), 1);
        assert!(matches!(
            report.failures[0].error,
            PluginError::UnreadableDirectory(_)
        ));
        assert_eq!(report.failures[0].path, missing);
        assert!(diagnostics.contains("cannot read directory"));
    }

    #[test]
    fn test_duplicate_mode_keeps_first() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(first.path(), "worm.plug");
        touch(second.path(), "worm2.plug");

        let (report, _) = load(&SearchPath::from_dirs(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]));

        assert_eq!(report.registry.count(), 1);
        assert_eq!(report.registry.image_count(), 1);
        match &report.failures[0].error {
            PluginError::DuplicateMode { name, first: origin } => {
                assert_eq!(name, "worm");
                assert_eq!(origin, &first.path().join("worm.plug"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_suffix_and_program() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "worm.so");
        touch(dir.path(), "bad.so");

        let mut out = Vec::new();
        let report = PluginLoader::with_opener(StemOpener)
            .suffix("so")
            .program_name("xlock")
            .load_with_diagnostics(&SearchPath::from_dirs(vec![dir.path().to_path_buf()]), &mut out);

        assert_eq!(report.registry.count(), 1);
        assert!(String::from_utf8(out).unwrap().starts_with("xlock: LoadModule: "));
    }

    #[test]
    fn test_empty_search_path_yields_empty_registry() {
        let (report, diagnostics) = load(&SearchPath::from_dirs(Vec::new()));
        assert!(report.registry.is_empty());
        assert!(report.failures.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fire.plug"), b"").unwrap();

        let entry = std::fs::read_dir(dir.path()).unwrap().next().unwrap();
        assert_eq!(entry_path(dir.path(), entry), Some(dir.path().join("fire.plug")));

        let broken = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(entry_path(dir.path(), broken), None);
    }
}
