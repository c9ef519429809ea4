//! Mode Host - Main Entry Point
//!
//! Runs screen-effect modes on headless screens for a fixed number of
//! frames, or lists and describes the available modes.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use mode_host::host::{self, Host, HostError, HostOptions};
use mode_host::modes::{RunOverrides, RANDOM_MODE};
use mode_host::settings::HostSettings;
use mode_host::telemetry::{init_logging, LogConfig};

/// Exit status for usage errors
const USAGE_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "mode-host")]
#[command(about = "Runs screen-effect modes loaded from plugins or compiled in")]
#[command(version)]
struct Cli {
    /// Mode to run, or `random` to rotate through the mode list
    #[arg(short, long)]
    mode: Option<String>,

    /// Plugin search path (`~` and `%D` are expanded)
    #[arg(long)]
    module_path: Option<String>,

    /// Use only the compiled-in modes
    #[arg(long)]
    builtin: bool,

    /// Modes eligible for `random`, e.g. "all -snow"
    #[arg(long)]
    modelist: Option<String>,

    /// Seconds each rotated mode runs (0 = forever)
    #[arg(long)]
    duration: Option<u64>,

    /// Rotate in name order instead of randomly
    #[arg(long)]
    sequential: bool,

    /// Seed for random rotation
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of screens
    #[arg(long)]
    screens: Option<usize>,

    /// Frames to run before exiting
    #[arg(long, default_value_t = 200)]
    frames: u64,

    /// Microseconds between frames
    #[arg(long)]
    delay: Option<i32>,

    #[arg(long)]
    count: Option<i32>,

    #[arg(long)]
    cycles: Option<i32>,

    #[arg(long)]
    size: Option<i32>,

    #[arg(long)]
    ncolors: Option<i32>,

    /// Color saturation between 0.0 and 1.0
    #[arg(long)]
    saturation: Option<f32>,

    /// Settings file to use instead of the one in the config directory
    #[arg(long)]
    settings: Option<PathBuf>,

    /// List the available modes and exit
    #[arg(long)]
    list: bool,

    /// List the available modes with their options and exit
    #[arg(long)]
    describe: bool,

    /// Print every mode's default resources and exit
    #[arg(long)]
    dump_resources: bool,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self, settings: &HostSettings) -> RunOverrides {
        let stored = settings.run_overrides();
        RunOverrides {
            delay: self.delay.or(stored.delay),
            count: self.count.or(stored.count),
            cycles: self.cycles.or(stored.cycles),
            size: self.size.or(stored.size),
            color_count: self.ncolors.or(stored.color_count),
            saturation: self.saturation.or(stored.saturation),
        }
    }

    fn host_options(&self, settings: &HostSettings) -> HostOptions {
        let option_overrides: HashMap<String, BTreeMap<String, String>> =
            settings.option_overrides();
        HostOptions {
            mode: self.mode.clone().unwrap_or_else(|| settings.default_mode.clone()),
            mode_list: self.modelist.clone().or_else(|| settings.mode_list.clone()),
            duration: Duration::from_secs(self.duration.unwrap_or(settings.duration_secs)),
            sequential: self.sequential || settings.sequential,
            seed: self.seed,
            screens: self.screens.unwrap_or(settings.screens),
            width: settings.surface_width,
            height: settings.surface_height,
            overrides: self.overrides(settings),
            option_overrides,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig {
        json_format: cli.log_json,
        file_enabled: cli.log_file.is_some(),
        file_path: cli.log_file.clone(),
        ..LogConfig::default()
    };
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("mode-host: {}", e);
            None
        }
    };

    let settings = match &cli.settings {
        Some(path) => match HostSettings::load_from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("mode-host: {}: {}", path.display(), e);
                return ExitCode::from(USAGE_EXIT);
            }
        },
        None => HostSettings::load(),
    };

    let module_path = cli.module_path.clone().or_else(|| settings.module_path.clone());
    let registry = host::build_registry(module_path.as_deref(), cli.builtin, &mut io::stderr());
    tracing::info!(modes = registry.count(), images = registry.image_count(), "Registry ready");

    if cli.list || cli.describe || cli.dump_resources {
        let mut stdout = io::stdout().lock();
        let result = if cli.dump_resources {
            host::dump_resources(&registry, &mut stdout)
        } else {
            host::write_mode_list(&registry, cli.describe, &mut stdout)
        };
        registry.unload();
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("mode-host: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let options = cli.host_options(&settings);
    let mut host = match Host::new(registry, &options) {
        Ok(host) => host,
        Err(e @ (HostError::UnknownMode { .. } | HostError::InvalidSettings(_))) => {
            eprintln!("mode-host: {}", e);
            eprintln!("Use `--list` to see the available modes.");
            return ExitCode::from(USAGE_EXIT);
        }
        Err(e) => {
            eprintln!("mode-host: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        mode = %options.mode,
        rotating = options.mode == RANDOM_MODE,
        screens = host.screens().len(),
        frames = cli.frames,
        "Starting"
    );
    host.run(cli.frames);
    host.shutdown();

    ExitCode::SUCCESS
}
