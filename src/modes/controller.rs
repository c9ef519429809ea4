//! Per-screen mode lifecycle controller
//!
//! A `ModeController` owns one screen's `ModeInfo` and the record of
//! which mode is live on it. It drives that mode through
//! `init`/`step`/`refresh`/`change`/`release` with these guarantees:
//!
//! - at most one mode is initialized on the screen at any time
//! - switching to a different mode releases the old one before the new
//!   one's `init` runs
//! - re-selecting the live mode re-runs `init` without a release, which
//!   several modes rely on to apply parameter changes
//! - repainting a mode without `refresh` restarts it, but never before
//!   its first step

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::{ModeChange, ModeDescriptor, ModeInfo, RunOverrides};

/// Which mode is live on a screen
#[derive(Debug, Clone, Default)]
pub struct ActiveModeState {
    current: Option<Arc<ModeDescriptor>>,
    /// Set by `init`, cleared by the first step after it
    just_initted: bool,
}

impl ActiveModeState {
    pub fn current(&self) -> Option<&Arc<ModeDescriptor>> {
        self.current.as_ref()
    }

    pub fn just_initted(&self) -> bool {
        self.just_initted
    }

    /// Check whether `mode` is the live mode (by identity)
    pub fn is_current(&self, mode: &Arc<ModeDescriptor>) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, mode))
    }
}

/// Drives the live mode of one screen
pub struct ModeController {
    info: ModeInfo,
    active: ActiveModeState,
    /// Mode used by `select_default` when the host picked none
    default_mode: Option<Arc<ModeDescriptor>>,
    /// Host-level numeric overrides applied on every mode switch
    overrides: RunOverrides,
    /// Raw option overrides keyed by mode name, then resource name
    option_overrides: HashMap<String, BTreeMap<String, String>>,
}

impl ModeController {
    /// Create a controller for a screen of the given size
    pub fn new(screen: usize, width: u32, height: u32) -> Self {
        Self::with_info(ModeInfo::new(screen, width, height))
    }

    pub fn with_info(info: ModeInfo) -> Self {
        Self {
            info,
            active: ActiveModeState::default(),
            default_mode: None,
            overrides: RunOverrides::default(),
            option_overrides: HashMap::new(),
        }
    }

    /// Set numeric overrides for subsequent mode switches
    pub fn set_overrides(&mut self, overrides: RunOverrides) {
        self.overrides = overrides;
    }

    /// Set a raw option override for one mode
    pub fn set_option_override(
        &mut self,
        mode: impl Into<String>,
        resource: impl Into<String>,
        raw: impl Into<String>,
    ) {
        self.option_overrides
            .entry(mode.into())
            .or_default()
            .insert(resource.into(), raw.into());
    }

    pub fn set_default_mode(&mut self, mode: Arc<ModeDescriptor>) {
        self.default_mode = Some(mode);
    }

    pub fn default_mode(&self) -> Option<&Arc<ModeDescriptor>> {
        self.default_mode.as_ref()
    }

    pub fn info(&self) -> &ModeInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut ModeInfo {
        &mut self.info
    }

    pub fn state(&self) -> &ActiveModeState {
        &self.active
    }

    /// The live mode, if any
    pub fn current(&self) -> Option<&Arc<ModeDescriptor>> {
        self.active.current()
    }

    /// Make `mode` the live mode and run its `init`
    pub fn select_mode(&mut self, mode: &Arc<ModeDescriptor>) {
        let reselect = self.active.is_current(mode);
        if !reselect {
            self.release_current();
            let overrides = self.option_overrides.get(mode.name());
            self.info.configure(mode, &self.overrides, overrides);
        }

        tracing::debug!(screen = self.info.screen, mode = mode.name(), reselect, "init");
        self.active.current = Some(Arc::clone(mode));
        mode.hooks().init(&mut self.info);
        if !reselect {
            mode.mark_initialized();
            tracing::info!(screen = self.info.screen, mode = mode.name(), "Mode selected");
        }
        self.active.just_initted = true;
    }

    /// Select the default mode if no mode is live
    ///
    /// Returns false when there is neither a live mode nor a default.
    pub fn select_default(&mut self) -> bool {
        if self.active.current.is_some() {
            return true;
        }
        match self.default_mode.clone() {
            Some(mode) => {
                self.select_mode(&mode);
                true
            }
            None => false,
        }
    }

    /// Produce one frame of the live mode
    pub fn step(&mut self) {
        let Some(mode) = self.active.current.clone() else {
            return;
        };
        mode.hooks().step(&mut self.info);
        self.info.frame += 1;
        self.active.just_initted = false;
    }

    /// Repaint the live mode after damage
    pub fn repaint(&mut self) {
        let Some(mode) = self.active.current.clone() else {
            return;
        };

        if mode.hooks().refresh(&mut self.info) {
            tracing::debug!(screen = self.info.screen, mode = mode.name(), "refreshed");
        } else if !mode.is_initialized() || self.active.just_initted {
            // Nothing drawn since init; restarting now would init twice.
        } else {
            self.select_mode(&mode);
        }
    }

    /// Deliver a live parameter change to the live mode
    pub fn notify(&mut self, change: &ModeChange) {
        let Some(mode) = self.active.current.clone() else {
            return;
        };

        match change.run.validate() {
            Ok(()) => self.info.run.apply(&change.run),
            Err(e) => tracing::warn!(
                screen = self.info.screen,
                mode = mode.name(),
                "ignoring run settings in change: {}",
                e
            ),
        }
        for (resource, value) in &change.options {
            self.info.options.insert(resource.clone(), value.clone());
        }

        tracing::debug!(screen = self.info.screen, mode = mode.name(), "change");
        mode.hooks().change(&mut self.info);
    }

    /// Release the live mode, leaving the screen with none
    pub fn release_current(&mut self) {
        let Some(mode) = self.active.current.take() else {
            return;
        };

        tracing::debug!(screen = self.info.screen, mode = mode.name(), "release");
        mode.hooks().release(&mut self.info);
        mode.mark_released();
        self.info.clear_state();
        self.active.just_initted = false;
    }
}

impl Drop for ModeController {
    fn drop(&mut self) {
        self.release_current();
    }
}

impl std::fmt::Debug for ModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeController")
            .field("screen", &self.info.screen)
            .field("current", &self.active.current.as_ref().map(|m| m.name()))
            .field("just_initted", &self.active.just_initted)
            .finish()
    }
}
