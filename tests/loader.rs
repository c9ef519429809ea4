//! Loader scenarios driven through manifest files instead of compiled
//! plugin images.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mode_host::modes::{ModeController, ModeDescriptor, ModeHooks, ModeInfo};
use mode_host::plugin::{ImageOpener, PluginError, PluginImage, PluginLoader, SearchPath};

type Journal = Arc<Mutex<Vec<String>>>;

/// Parsed `key = value` manifest standing in for an image
struct ManifestImage {
    fields: HashMap<String, String>,
    journal: Journal,
}

impl ManifestImage {
    fn flag(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|v| v == "yes")
    }
}

/// Which optional hooks a manifest declares
#[derive(Clone, Copy)]
struct Declared {
    release: bool,
    refresh: bool,
    change: bool,
}

struct ManifestHooks {
    name: String,
    declared: Declared,
    journal: Journal,
}

impl ManifestHooks {
    fn log(&self, hook: &str) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, hook));
    }
}

impl ModeHooks for ManifestHooks {
    fn init(&self, _mi: &mut ModeInfo) {
        self.log("init");
    }
    fn step(&self, _mi: &mut ModeInfo) {
        self.log("step");
    }
    fn release(&self, _mi: &mut ModeInfo) {
        if self.declared.release {
            self.log("release");
        }
    }
    fn refresh(&self, _mi: &mut ModeInfo) -> bool {
        if self.declared.refresh {
            self.log("refresh");
        }
        self.declared.refresh
    }
    fn change(&self, _mi: &mut ModeInfo) {
        if self.declared.change {
            self.log("change");
        }
    }
}

impl PluginImage for ManifestImage {
    fn resolve(self: Arc<Self>) -> Result<ModeDescriptor, PluginError> {
        let name = self
            .fields
            .get("name")
            .cloned()
            .ok_or_else(|| PluginError::Symbol("`name` is null".to_string()))?;
        if !self.flag("init") {
            return Err(PluginError::Symbol(
                "required hook `init` is not exported".to_string(),
            ));
        }
        let hooks = ManifestHooks {
            name: name.clone(),
            declared: Declared {
                release: self.flag("release"),
                refresh: self.flag("refresh"),
                change: self.flag("change"),
            },
            journal: Arc::clone(&self.journal),
        };
        Ok(ModeDescriptor::new(name, "manifest mode", hooks))
    }
}

#[derive(Default)]
struct ManifestOpener {
    journal: Journal,
}

impl ImageOpener for ManifestOpener {
    fn open(&self, path: &Path) -> Result<Arc<dyn PluginImage>, PluginError> {
        let text = fs::read_to_string(path).map_err(|e| PluginError::Open(e.to_string()))?;
        let fields = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        Ok(Arc::new(ManifestImage {
            fields,
            journal: Arc::clone(&self.journal),
        }))
    }
}

fn write(dir: &Path, file: &str, manifest: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, manifest).unwrap();
    path
}

fn scan(dirs: &[&Path], opener: ManifestOpener) -> (mode_host::LoadReport, Vec<String>) {
    let mut out = Vec::new();
    let report = PluginLoader::with_opener(opener).load_with_diagnostics(
        &SearchPath::from_dirs(dirs.iter().map(|d| d.to_path_buf()).collect()),
        &mut out,
    );
    let lines = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    (report, lines)
}

#[test]
fn test_two_valid_one_broken() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ok1.plug", "name = atlantis\ninit = yes\nstep = yes\n");
    write(dir.path(), "ok2.plug", "name = fire\ninit = yes\nstep = yes\n");
    write(dir.path(), "broken.plug", "name = worm\nstep = yes\n");

    let (report, diagnostics) = scan(&[dir.path()], ManifestOpener::default());

    let registry = &report.registry;
    assert_eq!(registry.count(), 2);
    assert_eq!(registry.at(0).unwrap().name(), "atlantis");
    assert_eq!(registry.at(1).unwrap().name(), "fire");
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].starts_with("mode-host: LoadModule: "));
    assert!(diagnostics[0].contains("broken.plug"));
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn test_result_independent_of_scan_order() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    write(first.path(), "a.plug", "name = swirl\ninit = yes\n");
    write(first.path(), "b.plug", "name = bat\n");
    write(second.path(), "c.plug", "name = atlantis\ninit = yes\n");
    write(second.path(), "d.plug", "name = fire\ninit = yes\n");

    let (forward, _) = scan(&[first.path(), second.path()], ManifestOpener::default());
    let (backward, _) = scan(&[second.path(), first.path()], ManifestOpener::default());

    let names = |r: &mode_host::LoadReport| r.registry.names().map(str::to_string).collect::<Vec<_>>();
    assert_eq!(names(&forward), vec!["atlantis", "fire", "swirl"]);
    assert_eq!(names(&forward), names(&backward));
    assert_eq!(forward.failures.len(), 1);
    assert_eq!(backward.failures.len(), 1);
}

#[test]
fn test_many_broken_files_never_abort() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..5 {
        write(dir.path(), &format!("bad{}.plug", i), "init = no\n");
    }
    write(dir.path(), "good.plug", "name = fire\ninit = yes\n");
    fs::write(dir.path().join("unreadable.plug"), [0xff, 0xfe, 0x00]).unwrap();

    let (report, diagnostics) = scan(&[dir.path()], ManifestOpener::default());

    assert_eq!(report.registry.count(), 1);
    assert_eq!(diagnostics.len(), 6);
    assert!(diagnostics.iter().any(|l| l.contains("unreadable.plug: cannot open image")));
}

#[test]
fn test_no_valid_images_yields_empty_registry() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.plug", "name = worm\n");

    let (report, diagnostics) = scan(&[dir.path()], ManifestOpener::default());

    assert!(report.registry.is_empty());
    assert_eq!(report.registry.count(), 0);
    assert!(report.registry.at(0).is_err());
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn test_loaded_modes_drive_through_controller() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.plug", "name = atlantis\ninit = yes\nrelease = yes\n");
    write(dir.path(), "f.plug", "name = fire\ninit = yes\n");
    let opener = ManifestOpener::default();
    let journal = Arc::clone(&opener.journal);

    let (report, _) = scan(&[dir.path()], opener);
    let atlantis = Arc::clone(report.registry.find_by_name("atlantis").unwrap());
    let fire = Arc::clone(report.registry.find_by_name("fire").unwrap());

    {
        let mut screen = ModeController::new(0, 8, 8);
        screen.select_mode(&atlantis);
        screen.step();
        screen.select_mode(&fire);
        screen.step();
        screen.repaint();
        screen.select_mode(&atlantis);
        assert!(!fire.is_initialized());
        assert!(atlantis.is_initialized());
    }

    assert_eq!(
        *journal.lock().unwrap(),
        vec![
            "atlantis:init",
            "atlantis:step",
            "atlantis:release",
            "fire:init",
            "fire:step",
            "fire:init",
            "atlantis:init",
            "atlantis:release",
        ]
    );
    assert!(!atlantis.is_initialized());
    report.registry.unload();
}
