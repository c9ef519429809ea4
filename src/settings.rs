//! Settings management for mode-host
//!
//! Host configuration persisted as XML in the user's config directory.
//! Command-line flags override whatever is loaded here.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::modes::RunOverrides;

/// One persisted option override for a mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOptionSetting {
    #[serde(rename = "@mode")]
    pub mode: String,
    #[serde(rename = "@option")]
    pub option: String,
    #[serde(rename = "@value")]
    pub value: String,
}

/// Persisted host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "ModeHostSettings")]
pub struct HostSettings {
    /// Plugin search path; the default module directory when unset
    #[serde(rename = "modulePath", default, skip_serializing_if = "Option::is_none")]
    pub module_path: Option<String>,

    /// Mode selected at startup
    #[serde(rename = "defaultMode", default = "default_mode")]
    pub default_mode: String,

    /// Modes eligible for rotation, in `+name -name` form
    #[serde(rename = "modeList", default, skip_serializing_if = "Option::is_none")]
    pub mode_list: Option<String>,

    /// Seconds each rotated mode runs (0 = forever)
    #[serde(rename = "duration", default = "default_duration")]
    pub duration_secs: u64,

    /// Rotate in registry order instead of randomly
    #[serde(rename = "sequential", default)]
    pub sequential: bool,

    /// Number of screens to drive
    #[serde(rename = "screens", default = "default_screens")]
    pub screens: usize,

    #[serde(rename = "surfaceWidth", default = "default_surface_width")]
    pub surface_width: u32,

    #[serde(rename = "surfaceHeight", default = "default_surface_height")]
    pub surface_height: u32,

    #[serde(rename = "delay", default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<i32>,

    #[serde(rename = "count", default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,

    #[serde(rename = "cycles", default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<i32>,

    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i32>,

    #[serde(rename = "ncolors", default, skip_serializing_if = "Option::is_none")]
    pub color_count: Option<i32>,

    #[serde(rename = "saturation", default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f32>,

    /// Per-mode option overrides
    #[serde(rename = "modeOption", default)]
    pub mode_options: Vec<ModeOptionSetting>,
}

fn default_mode() -> String {
    crate::modes::BLANK_MODE.to_string()
}

fn default_duration() -> u64 {
    60
}

fn default_screens() -> usize {
    1
}

fn default_surface_width() -> u32 {
    320
}

fn default_surface_height() -> u32 {
    240
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            module_path: None,
            default_mode: default_mode(),
            mode_list: None,
            duration_secs: default_duration(),
            sequential: false,
            screens: default_screens(),
            surface_width: default_surface_width(),
            surface_height: default_surface_height(),
            delay: None,
            count: None,
            cycles: None,
            size: None,
            color_count: None,
            saturation: None,
            mode_options: Vec::new(),
        }
    }
}

impl HostSettings {
    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("ModeHost");
            p.push("settings.xml");
            p
        })
    }

    /// Load settings from the config directory
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::settings_path() else {
            return Err(SettingsError::NoConfigDir);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }

        self.save_to_file(&path)
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut settings: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;

        // Ensure sane minimums.
        settings.screens = settings.screens.max(1);
        settings.surface_width = settings.surface_width.max(1);
        settings.surface_height = settings.surface_height.max(1);

        Ok(settings)
    }

    /// Save settings to an XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Numeric overrides stored in the settings
    pub fn run_overrides(&self) -> RunOverrides {
        RunOverrides {
            delay: self.delay,
            count: self.count,
            cycles: self.cycles,
            size: self.size,
            color_count: self.color_count,
            saturation: self.saturation,
        }
    }

    /// Option overrides grouped by mode name
    pub fn option_overrides(&self) -> HashMap<String, BTreeMap<String, String>> {
        let mut grouped: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        for setting in &self.mode_options {
            grouped
                .entry(setting.mode.clone())
                .or_default()
                .insert(setting.option.clone(), setting.value.clone());
        }
        grouped
    }

    /// Set or replace one option override
    pub fn set_mode_option(
        &mut self,
        mode: impl Into<String>,
        option: impl Into<String>,
        value: impl Into<String>,
    ) {
        let (mode, option, value) = (mode.into(), option.into(), value.into());
        match self
            .mode_options
            .iter_mut()
            .find(|s| s.mode == mode && s.option == option)
        {
            Some(existing) => existing.value = value,
            None => self.mode_options.push(ModeOptionSetting {
                mode,
                option,
                value,
            }),
        }
    }
}

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(#[source] quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(#[source] quick_xml::SeError),
    #[error("Could not find config directory")]
    NoConfigDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = HostSettings::default();
        assert_eq!(settings.default_mode, "blank");
        assert_eq!(settings.duration_secs, 60);
        assert_eq!(settings.screens, 1);
        assert!(settings.run_overrides().is_empty());
        assert!(settings.mode_options.is_empty());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.xml");

        let mut settings = HostSettings::default();
        settings.module_path = Some("~/modes:%D".to_string());
        settings.default_mode = "snow".to_string();
        settings.sequential = true;
        settings.count = Some(40);
        settings.saturation = Some(0.5);
        settings.set_mode_option("snow", "fade", "off");
        settings.save_to_file(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("<?xml"));
        assert!(contents.contains("<ModeHostSettings>"));

        let loaded = HostSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.run_overrides().count, Some(40));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.xml");
        fs::write(
            &path,
            "<ModeHostSettings><defaultMode>snow</defaultMode><screens>0</screens></ModeHostSettings>",
        )
        .unwrap();

        let loaded = HostSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded.default_mode, "snow");
        assert_eq!(loaded.screens, 1);
        assert_eq!(loaded.duration_secs, 60);
        assert_eq!(loaded.module_path, None);
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.xml");
        fs::write(&path, "<ModeHostSettings><screens>many</screens></ModeHostSettings>").unwrap();

        assert!(matches!(
            HostSettings::load_from_file(&path),
            Err(SettingsError::XmlParse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            HostSettings::load_from_file(&dir.path().join("absent.xml")),
            Err(SettingsError::Io(_))
        ));
    }

    #[test]
    fn test_option_overrides_grouped_by_mode() {
        let mut settings = HostSettings::default();
        settings.set_mode_option("snow", "fade", "off");
        settings.set_mode_option("snow", "seed", "7");
        settings.set_mode_option("snow", "fade", "on");
        settings.set_mode_option("fire", "heat", "3");

        let grouped = settings.option_overrides();
        assert_eq!(settings.mode_options.len(), 3);
        assert_eq!(grouped["snow"]["fade"], "on");
        assert_eq!(grouped["snow"]["seed"], "7");
        assert_eq!(grouped["fire"]["heat"], "3");
    }
}
