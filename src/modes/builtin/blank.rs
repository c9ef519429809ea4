//! Blank Mode
//!
//! Shows nothing but a black screen.

use crate::modes::traits::{ModeHooks, ModeInfo};
use crate::modes::{ModeDefaults, ModeDescriptor};

const BLACK: u32 = 0xff00_0000;

/// Blank mode hooks
pub struct BlankMode;

impl BlankMode {
    pub fn descriptor() -> ModeDescriptor {
        ModeDescriptor::new(super::BLANK, "Shows nothing but a black screen", BlankMode)
            .with_defaults(ModeDefaults {
                delay: 3_000_000,
                count: 1,
                cycles: 1,
                size: 1,
                color_count: 1,
                saturation: 1.0,
            })
    }
}

impl ModeHooks for BlankMode {
    fn init(&self, mi: &mut ModeInfo) {
        mi.surface.fill(BLACK);
    }

    fn step(&self, _mi: &mut ModeInfo) {}

    fn refresh(&self, mi: &mut ModeInfo) -> bool {
        mi.surface.fill(BLACK);
        true
    }

    fn change(&self, mi: &mut ModeInfo) {
        self.init(mi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fills_black() {
        let mut mi = ModeInfo::new(0, 4, 4);
        mi.surface.fill(0xffffffff);

        BlankMode.init(&mut mi);
        assert!(mi.surface.pixels.iter().all(|&p| p == BLACK));

        mi.surface.put(1, 1, 0xffff0000);
        assert!(BlankMode.refresh(&mut mi));
        assert_eq!(mi.surface.get(1, 1), Some(BLACK));
    }
}
