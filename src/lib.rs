//! Mode Host Library
//!
//! Discovers screen-effect modes (compiled in or loaded from plugin
//! images) and drives exactly one live mode per screen through its
//! init, step, repaint and change lifecycle.

pub mod host;
pub mod modes;
pub mod plugin;
pub mod settings;
pub mod telemetry;

pub use host::{Host, HostError, HostOptions};
pub use modes::{ModeController, ModeDescriptor, ModeHooks, ModeInfo, ModeRegistry, RegistryError};
pub use plugin::{LoadFailure, LoadReport, PluginError, PluginLoader, SearchPath};
pub use settings::{HostSettings, SettingsError};
