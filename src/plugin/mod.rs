//! Plugin image loading
//!
//! Discovers mode plugins on a search path and turns each valid image
//! into a `ModeDescriptor`. A bad image is reported and skipped; it
//! never aborts the scan.
//!
//! - **ABI** (`abi.rs`): C layout of the exported descriptor
//! - **Search path** (`search_path.rs`): `~` and `%D` expansion
//! - **Library** (`library.rs`): libloading-backed images
//! - **Loader** (`loader.rs`): directory scan and registry assembly

pub mod abi;
mod library;
mod loader;
mod search_path;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::modes::ModeDescriptor;

pub use library::{LibraryImage, LibraryOpener};
pub use loader::{LoadFailure, LoadReport, PluginLoader, DEFAULT_PLUGIN_SUFFIX, PROGRAM_NAME};
pub use search_path::{default_module_dir, SearchPath, DEFAULT_DIR_TOKEN};

/// Why a candidate image was not loaded
#[derive(Debug, Error)]
pub enum PluginError {
    /// The image could not be opened
    #[error("cannot open image: {0}")]
    Open(String),
    /// The descriptor symbol or a required hook could not be resolved
    #[error("{0}")]
    Symbol(String),
    /// Another image already provides this mode
    #[error("mode `{name}` already loaded from {}", .first.display())]
    DuplicateMode { name: String, first: PathBuf },
    /// A search path directory could not be listed
    #[error("cannot read directory: {0}")]
    UnreadableDirectory(#[source] io::Error),
}

/// An opened plugin image
///
/// Dropping the last reference closes the image. Descriptors resolved
/// from an image keep it open through their hooks.
pub trait PluginImage: Send + Sync {
    /// Resolve the exported mode descriptor
    fn resolve(self: Arc<Self>) -> Result<ModeDescriptor, PluginError>;
}

/// Opens candidate files as plugin images
pub trait ImageOpener {
    fn open(&self, path: &std::path::Path) -> Result<Arc<dyn PluginImage>, PluginError>;
}
