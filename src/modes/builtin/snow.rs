//! Snow Mode
//!
//! Scatters random flakes across the surface. The number of flakes per
//! step follows `count`; brightness follows `saturation`. Has no refresh
//! hook, so damage restarts it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::modes::traits::{ModeHooks, ModeInfo};
use crate::modes::{ModeDefaults, ModeDescriptor, ModeOption, OptionType};

const BLACK: u32 = 0xff00_0000;

/// Per-screen snow state
struct SnowState {
    rng: StdRng,
    fade: bool,
    flakes: u64,
}

/// Snow mode hooks
pub struct SnowMode;

impl SnowMode {
    pub fn descriptor() -> ModeDescriptor {
        ModeDescriptor::new("snow", "Shows random flakes drifting over the screen", SnowMode)
            .with_defaults(ModeDefaults {
                delay: 50_000,
                count: 40,
                cycles: 1,
                size: 1,
                color_count: 64,
                saturation: 1.0,
            })
            .with_options(vec![
                ModeOption::new("fade", "Fade", "on", OptionType::Bool, "turn on/off fading of old flakes"),
                ModeOption::new("seed", "Seed", "0", OptionType::Int, "random seed, 0 picks one per screen"),
            ])
    }

    fn fresh_state(mi: &ModeInfo) -> SnowState {
        let seed = match mi.option("seed").map(|v| v.as_i32()) {
            Some(seed) if seed != 0 => seed as u64,
            _ => mi.screen as u64 + 1,
        };
        SnowState {
            rng: StdRng::seed_from_u64(seed),
            fade: mi.option("fade").is_some_and(|v| v.as_bool()),
            flakes: 0,
        }
    }

    /// Number of flakes drawn so far on this screen
    pub fn flakes(mi: &ModeInfo) -> Option<u64> {
        mi.state::<SnowState>().map(|s| s.flakes)
    }
}

/// Dim a pixel towards black by one eighth per channel
fn dim(pixel: u32) -> u32 {
    let channel = |shift: u32| {
        let v = (pixel >> shift) & 0xff;
        (v - v / 8) << shift
    };
    BLACK | channel(16) | channel(8) | channel(0)
}

impl ModeHooks for SnowMode {
    fn init(&self, mi: &mut ModeInfo) {
        mi.surface.fill(BLACK);
        let state = Self::fresh_state(mi);
        mi.set_state(state);
    }

    fn step(&self, mi: &mut ModeInfo) {
        let (width, height) = (mi.width(), mi.height());
        if width == 0 || height == 0 {
            return;
        }
        // A step never draws more flakes than the surface has pixels.
        let flakes = (mi.run.count.max(1) as u64).min(u64::from(width) * u64::from(height));
        let level = (mi.run.saturation.clamp(0.0, 1.0) * 255.0) as u32;
        let white = BLACK | (level << 16) | (level << 8) | level;

        let Some((state, surface)) = mi.state_and_surface_mut::<SnowState>() else {
            return;
        };
        if state.fade {
            for pixel in surface.pixels.iter_mut() {
                *pixel = dim(*pixel);
            }
        }
        for _ in 0..flakes {
            let x = state.rng.random_range(0..width);
            let y = state.rng.random_range(0..height);
            surface.put(x, y, white);
        }
        state.flakes += flakes;
    }

    fn change(&self, mi: &mut ModeInfo) {
        let fade = mi.option("fade").is_some_and(|v| v.as_bool());
        if let Some(state) = mi.state_mut::<SnowState>() {
            state.fade = fade;
        }
    }
}
