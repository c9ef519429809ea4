//! Dynamic library plugin images
//!
//! Opens shared libraries with libloading and wraps their exported
//! descriptor in a `ModeHooks` implementation that forwards each hook
//! through the C ABI.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use libloading::{Library, Symbol};

use super::abi::{self, RawHook, RawHooks, RawModeDescriptor, RawModeInfo, MODE_DESCRIPTOR_SYMBOL};
use super::{ImageOpener, PluginError, PluginImage};
use crate::modes::{ModeDescriptor, ModeHooks, ModeInfo};

/// Opens candidate files as shared libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryOpener;

impl ImageOpener for LibraryOpener {
    fn open(&self, path: &Path) -> Result<Arc<dyn PluginImage>, PluginError> {
        // SAFETY: Loading a plugin runs its initializers; plugins on the
        // search path are trusted by contract.
        let library = unsafe { Library::new(path) }.map_err(|e| PluginError::Open(e.to_string()))?;
        Ok(Arc::new(LibraryImage {
            library,
            path: path.to_path_buf(),
        }))
    }
}

/// A loaded shared library
pub struct LibraryImage {
    library: Library,
    path: PathBuf,
}

impl LibraryImage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PluginImage for LibraryImage {
    fn resolve(self: Arc<Self>) -> Result<ModeDescriptor, PluginError> {
        // SAFETY: The symbol is the address of a `RawModeDescriptor`
        // static per the ABI contract; it is copied out while the
        // library is loaded.
        let raw: RawModeDescriptor = unsafe {
            let symbol: Symbol<*const RawModeDescriptor> = self
                .library
                .get(MODE_DESCRIPTOR_SYMBOL.as_bytes())
                .map_err(|e| {
                    PluginError::Symbol(format!("missing symbol `{}`: {}", MODE_DESCRIPTOR_SYMBOL, e))
                })?;
            let descriptor = *symbol;
            if descriptor.is_null() {
                return Err(PluginError::Symbol(format!(
                    "symbol `{}` is null",
                    MODE_DESCRIPTOR_SYMBOL
                )));
            }
            *descriptor
        };

        // SAFETY: The descriptor's pointers refer to data inside the
        // library, which stays loaded while `self` is alive.
        let decoded = unsafe { abi::decode_descriptor(&raw) }.map_err(PluginError::Symbol)?;
        if decoded.hooks.step.is_none() {
            tracing::warn!(path = %self.path.display(), mode = %decoded.name, "Plugin exports no step hook");
        }

        let hooks = LibraryHooks::new(decoded.hooks, self);
        Ok(
            ModeDescriptor::from_shared(decoded.name, decoded.description, Arc::new(hooks))
                .with_options(decoded.options)
                .with_defaults(decoded.defaults),
        )
    }
}

/// Plugin-owned per-screen pointer kept in the `ModeInfo` state slot
struct PluginUserdata(*mut c_void);

// The pointer is only handed back to the plugin on the owning screen's
// thread.
unsafe impl Send for PluginUserdata {}

/// Hooks forwarding to a plugin image
struct LibraryHooks {
    raw: RawHooks,
    /// Keeps the code behind `raw` mapped
    _image: Arc<dyn PluginImage>,
}

impl LibraryHooks {
    fn new(raw: RawHooks, image: Arc<dyn PluginImage>) -> Self {
        Self { raw, _image: image }
    }

    fn call(&self, hook: Option<RawHook>, mi: &mut ModeInfo) {
        let Some(hook) = hook else {
            return;
        };
        let userdata = mi
            .state::<PluginUserdata>()
            .map_or(ptr::null_mut(), |u| u.0);
        let mut raw = RawModeInfo::from_mode_info(mi, userdata);

        // SAFETY: The hook comes from a validated descriptor of a loaded
        // image and receives a pointer valid for the call.
        unsafe { hook(&mut raw) };

        if raw.userdata.is_null() {
            mi.clear_state();
        } else {
            mi.set_state(PluginUserdata(raw.userdata));
        }
    }
}

impl ModeHooks for LibraryHooks {
    fn init(&self, mi: &mut ModeInfo) {
        self.call(Some(self.raw.init), mi);
    }

    fn step(&self, mi: &mut ModeInfo) {
        self.call(self.raw.step, mi);
    }

    fn release(&self, mi: &mut ModeInfo) {
        self.call(self.raw.release, mi);
    }

    fn refresh(&self, mi: &mut ModeInfo) -> bool {
        self.call(self.raw.refresh, mi);
        self.raw.refresh.is_some()
    }

    fn change(&self, mi: &mut ModeInfo) {
        self.call(self.raw.change, mi);
    }
}
