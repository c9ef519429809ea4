//! Mode registry
//!
//! The registry holds every available mode descriptor, sorted by name.
//! It is built once, either from the compiled-in table or by the plugin
//! loader, and never changes afterwards, so screens on any thread can
//! share it.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::ModeDescriptor;
use crate::plugin::PluginImage;

/// Registry lookup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("mode index {index} out of range (registry holds {count} modes)")]
    InvalidIndex { index: usize, count: usize },
    #[error("unknown mode `{0}`")]
    NotFound(String),
}

/// Sorted, write-once set of mode descriptors
pub struct ModeRegistry {
    /// Descriptors in ascending name order
    modes: Vec<Arc<ModeDescriptor>>,
    /// Plugin images the descriptors were resolved from
    images: Vec<Arc<dyn PluginImage>>,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl ModeRegistry {
    /// Create a registry holding no modes
    pub fn empty() -> Self {
        Self {
            modes: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Build a registry from a compiled-in table
    pub fn from_static(table: Vec<ModeDescriptor>) -> Self {
        Self::from_parts(table, Vec::new())
    }

    /// Build a registry from loaded descriptors and the images backing them
    pub(crate) fn from_parts(
        descriptors: Vec<ModeDescriptor>,
        images: Vec<Arc<dyn PluginImage>>,
    ) -> Self {
        let mut modes: Vec<Arc<ModeDescriptor>> = descriptors.into_iter().map(Arc::new).collect();
        modes.sort_by(|a, b| a.name().cmp(b.name()));
        Self { modes, images }
    }

    /// Number of registered modes
    pub fn count(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Get the descriptor at a sorted position
    pub fn at(&self, index: usize) -> Result<&Arc<ModeDescriptor>, RegistryError> {
        self.modes.get(index).ok_or(RegistryError::InvalidIndex {
            index,
            count: self.modes.len(),
        })
    }

    /// Get a descriptor by mode name
    pub fn find_by_name(&self, name: &str) -> Result<&Arc<ModeDescriptor>, RegistryError> {
        self.index_of(name)
            .map(|index| &self.modes[index])
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Sorted position of a mode name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.modes
            .binary_search_by(|mode| mode.name().cmp(name))
            .ok()
    }

    /// Check if a mode name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Iterate descriptors in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ModeDescriptor>> {
        self.modes.iter()
    }

    /// All mode names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modes.iter().map(|mode| mode.name())
    }

    /// Position after `index`, wrapping to the first mode
    pub fn next_index(&self, index: usize) -> Result<usize, RegistryError> {
        self.at(index)?;
        Ok((index + 1) % self.modes.len())
    }

    /// Position before `index`, wrapping to the last mode
    pub fn previous_index(&self, index: usize) -> Result<usize, RegistryError> {
        self.at(index)?;
        Ok(index.checked_sub(1).unwrap_or(self.modes.len() - 1))
    }

    /// Number of plugin images kept open for the descriptors
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Drop every descriptor and close the plugin images
    ///
    /// Images stay mapped until the last descriptor referencing them is
    /// gone, so screens still holding a mode keep its code alive.
    pub fn unload(self) {
        let images = self.images.len();
        drop(self.modes);
        drop(self.images);
        if images > 0 {
            tracing::info!(images, "Plugin images released");
        }
    }
}

impl fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeRegistry")
            .field("modes", &self.names().collect::<Vec<_>>())
            .field("images", &self.images.len())
            .finish()
    }
}
