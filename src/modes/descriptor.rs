//! Mode descriptor
//!
//! A descriptor is the metadata and hook table of one mode. Descriptors
//! are built once (from the static table or by the plugin loader) and
//! shared read-only by every screen; the only mutable part is the count
//! of screens that currently have the mode initialized.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::traits::ModeHooks;
use super::{ModeDefaults, ModeOption, OptionValue};

/// Metadata and hooks describing one mode
pub struct ModeDescriptor {
    name: String,
    description: String,
    hooks: Arc<dyn ModeHooks>,
    options: Vec<ModeOption>,
    defaults: ModeDefaults,
    /// Screens on which the mode is initialized and not yet released
    initialized_on: AtomicUsize,
}

impl ModeDescriptor {
    /// Create a descriptor with default numeric settings and no options
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        hooks: impl ModeHooks + 'static,
    ) -> Self {
        Self::from_shared(name, description, Arc::new(hooks))
    }

    /// Create a descriptor around an already shared hook table
    pub fn from_shared(
        name: impl Into<String>,
        description: impl Into<String>,
        hooks: Arc<dyn ModeHooks>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            hooks,
            options: Vec::new(),
            defaults: ModeDefaults::default(),
            initialized_on: AtomicUsize::new(0),
        }
    }

    pub fn with_options(mut self, options: Vec<ModeOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_defaults(mut self, defaults: ModeDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Mode name, unique within a registry
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hooks(&self) -> &dyn ModeHooks {
        self.hooks.as_ref()
    }

    pub fn options(&self) -> &[ModeOption] {
        &self.options
    }

    /// Find an option by resource name
    pub fn option(&self, resource: &str) -> Option<&ModeOption> {
        self.options.iter().find(|o| o.resource == resource)
    }

    pub fn defaults(&self) -> &ModeDefaults {
        &self.defaults
    }

    /// Typed defaults of every option whose default parses
    pub fn default_option_values(&self) -> BTreeMap<String, OptionValue> {
        let mut values = BTreeMap::new();
        for option in &self.options {
            match option.default_value() {
                Ok(value) => {
                    values.insert(option.resource.clone(), value);
                }
                Err(e) => {
                    tracing::warn!(mode = %self.name, option = %option.resource, "Bad option default: {}", e);
                }
            }
        }
        values
    }

    /// Whether the mode is initialized on at least one screen
    pub fn is_initialized(&self) -> bool {
        self.initialized_on.load(Ordering::Acquire) > 0
    }

    /// Number of screens with the mode initialized
    pub fn initialized_screens(&self) -> usize {
        self.initialized_on.load(Ordering::Acquire)
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized_on.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn mark_released(&self) {
        // Saturate at zero; a release without a matching init is a no-op.
        let _ = self
            .initialized_on
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

impl fmt::Debug for ModeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("options", &self.options.len())
            .field("defaults", &self.defaults)
            .field("initialized_on", &self.initialized_screens())
            .finish()
    }
}
