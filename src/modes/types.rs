//! Core mode data types
//!
//! These types describe what a mode accepts (option schema, numeric
//! defaults) and the live values a screen runs it with. They carry no
//! hook references, following the descriptor/runtime split used by the
//! rest of the crate.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value type of a mode option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    String,
    Float,
    Int,
    Bool,
}

impl OptionType {
    /// Short lowercase name used in help output
    pub fn name(&self) -> &'static str {
        match self {
            OptionType::String => "string",
            OptionType::Float => "float",
            OptionType::Int => "int",
            OptionType::Bool => "bool",
        }
    }

    /// Parse a raw resource string into a typed value
    pub fn parse(&self, raw: &str) -> Result<OptionValue, OptionParseError> {
        let trimmed = raw.trim();
        let invalid = || OptionParseError {
            kind: *self,
            raw: raw.to_string(),
        };
        match self {
            OptionType::String => Ok(OptionValue::String(raw.to_string())),
            OptionType::Float => trimmed
                .parse::<f32>()
                .map(OptionValue::Float)
                .map_err(|_| invalid()),
            OptionType::Int => trimmed
                .parse::<i32>()
                .map(OptionValue::Int)
                .map_err(|_| invalid()),
            OptionType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => Ok(OptionValue::Bool(true)),
                "off" | "false" | "no" | "0" => Ok(OptionValue::Bool(false)),
                _ => Err(invalid()),
            },
        }
    }
}

/// A raw option string could not be read as the option's type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("`{raw}` is not a valid {} value", .kind.name())]
pub struct OptionParseError {
    pub kind: OptionType,
    pub raw: String,
}

/// Typed value of a mode option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    String(String),
    Float(f32),
    Int(i32),
    Bool(bool),
}

impl OptionValue {
    /// Get the value as f32 (returns 0.0 for strings)
    pub fn as_f32(&self) -> f32 {
        match self {
            OptionValue::Float(v) => *v,
            OptionValue::Int(v) => *v as f32,
            OptionValue::Bool(v) => if *v { 1.0 } else { 0.0 },
            OptionValue::String(_) => 0.0,
        }
    }

    /// Get the value as i32 (returns 0 for strings)
    pub fn as_i32(&self) -> i32 {
        match self {
            OptionValue::Int(v) => *v,
            OptionValue::Float(v) => *v as i32,
            OptionValue::Bool(v) => if *v { 1 } else { 0 },
            OptionValue::String(_) => 0,
        }
    }

    /// Get the value as bool (returns false for strings)
    pub fn as_bool(&self) -> bool {
        match self {
            OptionValue::Bool(v) => *v,
            OptionValue::Int(v) => *v != 0,
            OptionValue::Float(v) => *v > 0.5,
            OptionValue::String(_) => false,
        }
    }

    /// Get the value as &str (returns empty string for non-string types)
    pub fn as_str(&self) -> &str {
        match self {
            OptionValue::String(v) => v.as_str(),
            _ => "",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::String(v) => write!(f, "{}", v),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Bool(v) => write!(f, "{}", if *v { "on" } else { "off" }),
        }
    }
}

/// One entry of a mode's option table
///
/// Maps a command-line flag to a resource name and class, with the
/// default given as the raw resource string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeOption {
    /// Command-line flag (e.g. "-fade")
    pub flag: String,
    /// Resource name, also the key in `ModeInfo::options`
    pub resource: String,
    /// Resource class (e.g. "Fade")
    pub class: String,
    /// Default as a raw resource string
    pub default: String,
    /// Value type
    pub kind: OptionType,
    /// One-line help text
    pub help: String,
}

impl ModeOption {
    /// Create an option whose flag is derived from the resource name
    pub fn new(
        resource: impl Into<String>,
        class: impl Into<String>,
        default: impl Into<String>,
        kind: OptionType,
        help: impl Into<String>,
    ) -> Self {
        let resource = resource.into();
        Self {
            flag: format!("-{}", resource),
            resource,
            class: class.into(),
            default: default.into(),
            kind,
            help: help.into(),
        }
    }

    /// Parse the default into a typed value
    pub fn default_value(&self) -> Result<OptionValue, OptionParseError> {
        self.kind.parse(&self.default)
    }
}

/// Numeric defaults every mode declares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeDefaults {
    /// Microseconds between steps
    pub delay: i32,
    pub count: i32,
    pub cycles: i32,
    pub size: i32,
    pub color_count: i32,
    pub saturation: f32,
}

impl Default for ModeDefaults {
    fn default() -> Self {
        Self {
            delay: 200_000,
            count: 1,
            cycles: 1,
            size: 1,
            color_count: 64,
            saturation: 1.0,
        }
    }
}

/// Live numeric settings of one screen
///
/// Seeded from the selected mode's defaults, then adjusted by the
/// host's overrides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSettings {
    pub delay: i32,
    pub count: i32,
    pub cycles: i32,
    pub size: i32,
    pub color_count: i32,
    pub saturation: f32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_defaults(&ModeDefaults::default())
    }
}

impl RunSettings {
    pub fn from_defaults(defaults: &ModeDefaults) -> Self {
        Self {
            delay: defaults.delay,
            count: defaults.count,
            cycles: defaults.cycles,
            size: defaults.size,
            color_count: defaults.color_count,
            saturation: defaults.saturation,
        }
    }

    /// Apply every override that is set
    pub fn apply(&mut self, overrides: &RunOverrides) {
        if let Some(v) = overrides.delay {
            self.delay = v;
        }
        if let Some(v) = overrides.count {
            self.count = v;
        }
        if let Some(v) = overrides.cycles {
            self.cycles = v;
        }
        if let Some(v) = overrides.size {
            self.size = v;
        }
        if let Some(v) = overrides.color_count {
            self.color_count = v;
        }
        if let Some(v) = overrides.saturation {
            self.saturation = v;
        }
    }
}

/// Host-level overrides of the numeric settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunOverrides {
    pub delay: Option<i32>,
    pub count: Option<i32>,
    pub cycles: Option<i32>,
    pub size: Option<i32>,
    pub color_count: Option<i32>,
    pub saturation: Option<f32>,
}

/// Invalid host-level override
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunSettingsError {
    #[error("saturation must be between 0.0 and 1.0, got {0}")]
    Saturation(f32),
    #[error("delay must not be negative, got {0}")]
    Delay(i32),
}

impl RunOverrides {
    /// Check the overrides before they reach any screen
    pub fn validate(&self) -> Result<(), RunSettingsError> {
        if let Some(saturation) = self.saturation {
            if !(0.0..=1.0).contains(&saturation) {
                return Err(RunSettingsError::Saturation(saturation));
            }
        }
        if let Some(delay) = self.delay {
            if delay < 0 {
                return Err(RunSettingsError::Delay(delay));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == RunOverrides::default()
    }
}

/// Live parameter change delivered to the active mode
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeChange {
    /// Numeric settings to replace
    pub run: RunOverrides,
    /// Option values to replace, keyed by resource name
    pub options: BTreeMap<String, OptionValue>,
}

impl ModeChange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one option value
    pub fn option(mut self, resource: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(resource.into(), value);
        self
    }

    /// Replace the numeric overrides
    pub fn run(mut self, run: RunOverrides) -> Self {
        self.run = run;
        self
    }
}
