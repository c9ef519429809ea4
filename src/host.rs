//! Headless host driving one controller per screen
//!
//! Builds the registry, resolves the requested mode and runs the frame
//! loop: step every screen, repaint periodically, apply rotation.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::modes::{
    builtin, parse_mode_list, ModeController, ModeDescriptor, ModePicker, ModeRegistry,
    Rotation, RunOverrides, RunSettingsError, RANDOM_MODE,
};
use crate::plugin::{PluginLoader, SearchPath};
use crate::telemetry::StepProfiler;

/// Frames between forced repaints
pub const REPAINT_INTERVAL: u64 = 50;

/// Resource class prefix used by `dump_resources`
pub const RESOURCE_CLASS: &str = "ModeHost";

/// Host startup failures
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Unknown mode `{name}`; available modes: {}", .available.join(" "))]
    UnknownMode { name: String, available: Vec<String> },
    #[error(transparent)]
    InvalidSettings(#[from] RunSettingsError),
    #[error("no modes available")]
    EmptyRegistry,
    #[error("mode list selects no modes")]
    EmptyModeList,
}

/// Resolved host configuration
#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Mode name, or `random` for rotation
    pub mode: String,
    pub mode_list: Option<String>,
    /// How long each rotated mode runs
    pub duration: Duration,
    pub sequential: bool,
    pub seed: u64,
    pub screens: usize,
    pub width: u32,
    pub height: u32,
    pub overrides: RunOverrides,
    /// Raw option values keyed by mode name, then resource name
    pub option_overrides: HashMap<String, BTreeMap<String, String>>,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            mode: crate::modes::BLANK_MODE.to_string(),
            mode_list: None,
            duration: Duration::from_secs(60),
            sequential: false,
            seed: 0,
            screens: 1,
            width: 320,
            height: 240,
            overrides: RunOverrides::default(),
            option_overrides: HashMap::new(),
        }
    }
}

/// Build the registry from the search path
///
/// Falls back to the built-in modes when `builtin` is set or the scan
/// finds nothing. Load diagnostics go to `diagnostics`.
pub fn build_registry(
    module_path: Option<&str>,
    builtin: bool,
    diagnostics: &mut dyn Write,
) -> ModeRegistry {
    if builtin {
        tracing::info!("Using built-in modes");
        return builtin::builtin_registry();
    }

    let search_path = module_path.map(SearchPath::parse).unwrap_or_default();
    let report = PluginLoader::new().load_with_diagnostics(&search_path, diagnostics);
    if report.registry.is_empty() {
        tracing::info!("No plugin modes found, using built-in modes");
        return builtin::builtin_registry();
    }
    report.registry
}

/// Print mode names and descriptions, and with `describe` each option
pub fn write_mode_list(
    registry: &ModeRegistry,
    describe: bool,
    out: &mut dyn Write,
) -> io::Result<()> {
    let width = registry.names().map(str::len).max().unwrap_or(0);
    for mode in registry.iter() {
        writeln!(out, "{:<width$}  {}", mode.name(), mode.description(), width = width)?;
        if describe {
            for option in mode.options() {
                writeln!(
                    out,
                    "    {:<16} {} (default {})",
                    option.flag, option.help, option.default
                )?;
            }
        }
    }
    Ok(())
}

/// Print every mode's default resources
///
/// One `ModeHost.<mode>.<resource>: <value>` line per numeric default,
/// then one per option.
pub fn dump_resources(registry: &ModeRegistry, out: &mut dyn Write) -> io::Result<()> {
    for mode in registry.iter() {
        let d = mode.defaults();
        let numeric: [(&str, String); 6] = [
            ("delay", d.delay.to_string()),
            ("count", d.count.to_string()),
            ("cycles", d.cycles.to_string()),
            ("size", d.size.to_string()),
            ("ncolors", d.color_count.to_string()),
            ("saturation", d.saturation.to_string()),
        ];
        for (resource, value) in numeric {
            writeln!(out, "{}.{}.{}: {}", RESOURCE_CLASS, mode.name(), resource, value)?;
        }
        for option in mode.options() {
            writeln!(
                out,
                "{}.{}.{}: {}",
                RESOURCE_CLASS,
                mode.name(),
                option.resource,
                option.default
            )?;
        }
    }
    Ok(())
}

/// Resolve a mode name to a registry entry
pub fn find_mode<'a>(
    registry: &'a ModeRegistry,
    name: &str,
) -> Result<&'a Arc<ModeDescriptor>, HostError> {
    registry
        .find_by_name(name)
        .map_err(|_| HostError::UnknownMode {
            name: name.to_string(),
            available: registry.names().map(str::to_string).collect(),
        })
}

/// The running host
pub struct Host {
    screens: Vec<ModeController>,
    rotation: Option<Rotation>,
    profiler: StepProfiler,
    frame: u64,
    registry: ModeRegistry,
}

impl Host {
    /// Create the screens and select the starting mode on each
    pub fn new(registry: ModeRegistry, options: &HostOptions) -> Result<Self, HostError> {
        options.overrides.validate()?;
        if registry.is_empty() {
            return Err(HostError::EmptyRegistry);
        }

        let (start, rotation) = if options.mode == RANDOM_MODE {
            let list = parse_mode_list(options.mode_list.as_deref().unwrap_or(""), &registry);
            if list.indices.is_empty() {
                return Err(HostError::EmptyModeList);
            }
            let picker = ModePicker::new(list.indices, options.sequential, options.seed);
            (None, Some(Rotation::new(picker, options.duration)))
        } else {
            (Some(Arc::clone(find_mode(&registry, &options.mode)?)), None)
        };

        let fallback = registry
            .find_by_name(crate::modes::BLANK_MODE)
            .or_else(|_| registry.at(0))
            .map(Arc::clone)
            .ok();

        let screens = (0..options.screens.max(1))
            .map(|screen| {
                let mut controller = ModeController::new(screen, options.width, options.height);
                controller.set_overrides(options.overrides);
                for (mode, values) in &options.option_overrides {
                    for (resource, raw) in values {
                        controller.set_option_override(mode.clone(), resource.clone(), raw.clone());
                    }
                }
                if let Some(mode) = &fallback {
                    controller.set_default_mode(Arc::clone(mode));
                }
                controller
            })
            .collect();

        let mut host = Self {
            screens,
            rotation,
            profiler: StepProfiler::new(),
            frame: 0,
            registry,
        };

        match start {
            Some(mode) => host.select_all(&mode),
            None => host.rotate(Instant::now()),
        }
        Ok(host)
    }

    pub fn screens(&self) -> &[ModeController] {
        &self.screens
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub fn profiler(&self) -> &StepProfiler {
        &self.profiler
    }

    /// Frames produced so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Select `mode` on every screen
    pub fn select_all(&mut self, mode: &Arc<ModeDescriptor>) {
        for screen in &mut self.screens {
            screen.select_mode(mode);
        }
    }

    /// Switch every screen to the next rotated mode if one is due
    fn rotate(&mut self, now: Instant) {
        let Some(index) = self.rotation.as_mut().and_then(|r| r.poll(now)) else {
            return;
        };
        match self.registry.at(index).map(Arc::clone) {
            Ok(mode) => {
                tracing::info!(mode = mode.name(), "Rotating mode");
                self.select_all(&mode);
            }
            Err(e) => tracing::warn!("Rotation picked an invalid mode: {}", e),
        }
    }

    /// Produce one frame on every screen
    pub fn step_frame(&mut self, now: Instant) {
        self.profiler.begin_step();
        for screen in &mut self.screens {
            if !screen.select_default() {
                continue;
            }
            screen.step();
        }
        self.profiler.end_step();

        self.frame += 1;
        if self.frame % REPAINT_INTERVAL == 0 {
            for screen in &mut self.screens {
                screen.repaint();
            }
        }
        self.rotate(now);
    }

    /// Delay requested by the first screen's live mode
    pub fn delay(&self) -> Duration {
        let micros = self
            .screens
            .first()
            .map(|s| s.info().run.delay.max(0))
            .unwrap_or(0);
        Duration::from_micros(micros as u64)
    }

    /// Run `frames` frames, sleeping the mode delay between them
    pub fn run(&mut self, frames: u64) {
        for _ in 0..frames {
            self.step_frame(Instant::now());
            thread::sleep(self.delay());
        }

        let stats = self.profiler.stats();
        tracing::info!(
            frames = self.frame,
            avg_ms = stats.avg_ms,
            p95_ms = stats.p95_ms,
            max_ms = stats.max_ms,
            "Run finished"
        );
    }

    /// Release every screen's mode, then unload the registry
    pub fn shutdown(mut self) {
        for screen in &mut self.screens {
            screen.release_current();
        }
        let Host {
            screens, registry, ..
        } = self;
        drop(screens);
        registry.unload();
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("screens", &self.screens.len())
            .field("frame", &self.frame)
            .field("rotating", &self.rotation.is_some())
            .finish()
    }
}
