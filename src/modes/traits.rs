//! Mode hook trait and per-screen mode info
//!
//! This module defines the interface every mode implements:
//! - `ModeHooks` - the five lifecycle hooks, `init` and `step` required
//! - `ModeInfo` - the per-screen data handed to every hook

use std::any::Any;
use std::collections::BTreeMap;

use super::{ModeDescriptor, OptionValue, RunOverrides, RunSettings};

/// Lifecycle hooks of a mode
///
/// Hooks receive the screen's `ModeInfo`; anything a mode keeps between
/// calls lives in the info's private state slot, never in `self`, so one
/// implementation can run on several screens at once.
pub trait ModeHooks: Send + Sync {
    /// Set up the mode on a screen. May be called again without an
    /// intervening `release`.
    fn init(&self, mi: &mut ModeInfo);

    /// Advance one frame
    fn step(&self, mi: &mut ModeInfo);

    /// Surrender resources before another mode takes the screen
    fn release(&self, _mi: &mut ModeInfo) {}

    /// Repaint after damage without restarting
    ///
    /// Returns false when the mode cannot repaint incrementally, in which
    /// case the controller restarts it instead.
    fn refresh(&self, _mi: &mut ModeInfo) -> bool {
        false
    }

    /// React to a live parameter change
    fn change(&self, _mi: &mut ModeInfo) {}
}

/// Software pixel buffer a mode may draw into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    /// 0xAARRGGBB pixels, row-major
    pub pixels: Vec<u32>,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Fill every pixel with one color
    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Set a pixel, ignoring coordinates outside the surface
    pub fn put(&mut self, x: u32, y: u32, color: u32) {
        if x < self.width && y < self.height {
            let index = y as usize * self.width as usize + x as usize;
            self.pixels[index] = color;
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }
}

/// Per-screen data passed to every hook
pub struct ModeInfo {
    /// Screen index within the host
    pub screen: usize,
    /// Live numeric settings
    pub run: RunSettings,
    /// Resolved option values, keyed by resource name
    pub options: BTreeMap<String, OptionValue>,
    /// Steps taken since the last mode switch
    pub frame: u64,
    pub surface: Surface,
    /// Mode-private state created by `init`, cleared after `release`
    state: Option<Box<dyn Any + Send>>,
}

impl ModeInfo {
    pub fn new(screen: usize, width: u32, height: u32) -> Self {
        Self {
            screen,
            run: RunSettings::default(),
            options: BTreeMap::new(),
            frame: 0,
            surface: Surface::new(width, height),
            state: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.surface.width
    }

    pub fn height(&self) -> u32 {
        self.surface.height
    }

    /// Look up an option value by resource name
    pub fn option(&self, resource: &str) -> Option<&OptionValue> {
        self.options.get(resource)
    }

    /// Replace the private state slot
    pub fn set_state<T: Any + Send>(&mut self, state: T) {
        self.state = Some(Box::new(state));
    }

    /// Borrow the private state if it has type `T`
    pub fn state<T: Any + Send>(&self) -> Option<&T> {
        self.state.as_ref().and_then(|s| s.downcast_ref::<T>())
    }

    /// Mutably borrow the private state if it has type `T`
    pub fn state_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.state.as_mut().and_then(|s| s.downcast_mut::<T>())
    }

    /// Borrow the private state and the surface together
    pub fn state_and_surface_mut<T: Any + Send>(&mut self) -> Option<(&mut T, &mut Surface)> {
        let state = self.state.as_mut()?.downcast_mut::<T>()?;
        Some((state, &mut self.surface))
    }

    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    pub fn clear_state(&mut self) {
        self.state = None;
    }

    /// Load the settings and option values for a newly selected mode
    pub(crate) fn configure(
        &mut self,
        mode: &ModeDescriptor,
        overrides: &RunOverrides,
        option_overrides: Option<&BTreeMap<String, String>>,
    ) {
        self.run = RunSettings::from_defaults(mode.defaults());
        self.run.apply(overrides);
        self.options = mode.default_option_values();
        self.frame = 0;

        let Some(raw_values) = option_overrides else {
            return;
        };
        for (resource, raw) in raw_values {
            let Some(option) = mode.option(resource) else {
                tracing::warn!(mode = mode.name(), option = %resource, "Ignoring override for unknown option");
                continue;
            };
            match option.kind.parse(raw) {
                Ok(value) => {
                    self.options.insert(resource.clone(), value);
                }
                Err(e) => {
                    tracing::warn!(mode = mode.name(), option = %resource, "Ignoring option override: {}", e);
                }
            }
        }
    }
}

impl std::fmt::Debug for ModeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeInfo")
            .field("screen", &self.screen)
            .field("run", &self.run)
            .field("options", &self.options)
            .field("frame", &self.frame)
            .field("width", &self.surface.width)
            .field("height", &self.surface.height)
            .field("has_state", &self.state.is_some())
            .finish()
    }
}
