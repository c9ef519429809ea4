//! Mode selection helpers
//!
//! Parsing of mode lists (`"all -blank +fire"`), the random/sequential
//! picker behind the `random` pseudo-mode, and the timed rotation that
//! switches every screen once the picked mode has run long enough.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ModeRegistry;

/// Mode excluded from `all` and from the default list
pub const BLANK_MODE: &str = "blank";

/// Name of the pseudo-mode that rotates through the mode list
pub const RANDOM_MODE: &str = "random";

/// Result of parsing a mode list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeList {
    /// Selected registry indices, ascending
    pub indices: Vec<usize>,
    /// Tokens that named no registered mode
    pub unrecognized: Vec<String>,
}

/// Parse a mode list against a registry
///
/// Tokens are separated by spaces, commas, tabs or newlines. A `-`
/// switches to excluding and `+` back to including; the sign sticks
/// until changed. `all` covers every mode except `blank`. An empty
/// selection falls back to every mode except `blank`.
pub fn parse_mode_list(text: &str, registry: &ModeRegistry) -> ModeList {
    let mut selected = vec![false; registry.count()];
    let mut unrecognized = Vec::new();
    let mut include = true;
    let mut token = String::new();

    let mut apply = |token: &mut String, include: bool| {
        if token.is_empty() {
            return;
        }
        if token == "all" {
            for (index, mode) in registry.iter().enumerate() {
                if mode.name() != BLANK_MODE {
                    selected[index] = include;
                }
            }
        } else if let Some(index) = registry.index_of(token) {
            selected[index] = include;
        } else {
            tracing::warn!(mode = %token, "Unrecognized mode in mode list");
            unrecognized.push(token.clone());
        }
        token.clear();
    };

    for c in text.chars() {
        match c {
            '+' | '-' => {
                apply(&mut token, include);
                include = c == '+';
            }
            ' ' | ',' | '\t' | '\n' => apply(&mut token, include),
            _ => token.push(c),
        }
    }
    apply(&mut token, include);

    let mut indices: Vec<usize> = selected
        .iter()
        .enumerate()
        .filter_map(|(index, &on)| on.then_some(index))
        .collect();
    if indices.is_empty() {
        indices = registry
            .iter()
            .enumerate()
            .filter(|(_, mode)| mode.name() != BLANK_MODE)
            .map(|(index, _)| index)
            .collect();
    }

    ModeList {
        indices,
        unrecognized,
    }
}

/// Picks modes from a candidate list
///
/// Random picks draw without replacement until every candidate has run,
/// and never repeat the previous pick while another choice remains.
/// Sequential picks walk the list in order, wrapping around.
#[derive(Debug, Clone)]
pub struct ModePicker {
    candidates: Vec<usize>,
    /// Candidates not yet drawn in the current round
    pool: Vec<usize>,
    last: Option<usize>,
    cursor: Option<usize>,
    sequential: bool,
    rng: StdRng,
}

impl ModePicker {
    pub fn new(candidates: Vec<usize>, sequential: bool, seed: u64) -> Self {
        Self {
            candidates,
            pool: Vec::new(),
            last: None,
            cursor: None,
            sequential,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    pub fn last(&self) -> Option<usize> {
        self.last
    }

    /// Pick the next registry index, or None without candidates
    pub fn pick(&mut self) -> Option<usize> {
        if self.candidates.is_empty() {
            return None;
        }

        let picked = if self.sequential {
            let next = self.cursor.map_or(0, |c| (c + 1) % self.candidates.len());
            self.cursor = Some(next);
            self.candidates[next]
        } else {
            if self.pool.is_empty() {
                self.pool = self.candidates.clone();
            }
            let eligible: Vec<usize> = (0..self.pool.len())
                .filter(|&slot| self.pool.len() == 1 || Some(self.pool[slot]) != self.last)
                .collect();
            let slot = eligible[self.rng.random_range(0..eligible.len())];
            self.pool.swap_remove(slot)
        };

        self.last = Some(picked);
        Some(picked)
    }
}

/// Timed switching between picked modes
#[derive(Debug, Clone)]
pub struct Rotation {
    picker: ModePicker,
    /// How long a pick runs; zero keeps the first pick forever
    duration: Duration,
    started: Option<Instant>,
}

impl Rotation {
    pub fn new(picker: ModePicker, duration: Duration) -> Self {
        Self {
            picker,
            duration,
            started: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Check whether a new pick is due
    pub fn is_due(&self, now: Instant) -> bool {
        match self.started {
            None => true,
            Some(_) if self.duration.is_zero() => false,
            Some(started) => now.saturating_duration_since(started) >= self.duration,
        }
    }

    /// Pick the next mode if one is due
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        if !self.is_due(now) {
            return None;
        }
        let picked = self.picker.pick()?;
        self.started = Some(now);
        Some(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{ModeDescriptor, ModeHooks, ModeInfo};
    use std::collections::HashSet;

    struct Nop;

    impl ModeHooks for Nop {
        fn init(&self, _mi: &mut ModeInfo) {}
        fn step(&self, _mi: &mut ModeInfo) {}
    }

    fn registry() -> ModeRegistry {
        // Sorted: atlantis=0, bat=1, blank=2, fire=3, swirl=4
        ModeRegistry::from_static(
            ["swirl", "blank", "fire", "bat", "atlantis"]
                .iter()
                .map(|name| ModeDescriptor::new(*name, "", Nop))
                .collect(),
        )
    }

    #[test]
    fn test_parse_mode_list_names() {
        let list = parse_mode_list("fire, bat\tswirl", &registry());
        assert_eq!(list.indices, vec![1, 3, 4]);
        assert!(list.unrecognized.is_empty());
    }

    #[test]
    fn test_parse_mode_list_signs_are_sticky() {
        let list = parse_mode_list("all -fire bat +swirl", &registry());
        assert_eq!(list.indices, vec![0, 4]);

        let list = parse_mode_list("all-fire", &registry());
        assert_eq!(list.indices, vec![0, 1, 4]);
    }

    #[test]
    fn test_parse_mode_list_all_skips_blank() {
        let list = parse_mode_list("all", &registry());
        assert_eq!(list.indices, vec![0, 1, 3, 4]);

        let list = parse_mode_list("all +blank", &registry());
        assert_eq!(list.indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_mode_list_empty_and_unknown() {
        let list = parse_mode_list("", &registry());
        assert_eq!(list.indices, vec![0, 1, 3, 4]);

        let list = parse_mode_list("tunnel fire", &registry());
        assert_eq!(list.indices, vec![3]);
        assert_eq!(list.unrecognized, vec!["tunnel".to_string()]);
    }

    #[test]
    fn test_picker_sequential_wraps() {
        let mut picker = ModePicker::new(vec![4, 7, 9], true, 0);
        let picks: Vec<_> = (0..5).filter_map(|_| picker.pick()).collect();
        assert_eq!(picks, vec![4, 7, 9, 4, 7]);
    }

    #[test]
    fn test_picker_random_covers_round_without_repeat() {
        let mut picker = ModePicker::new(vec![0, 1, 2, 3, 4], false, 42);

        let round: HashSet<_> = (0..5).filter_map(|_| picker.pick()).collect();
        assert_eq!(round.len(), 5);

        let mut previous = picker.last();
        for _ in 0..50 {
            let next = picker.pick();
            assert_ne!(next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_picker_is_reproducible() {
        let mut a = ModePicker::new(vec![0, 1, 2, 3, 4, 5], false, 7);
        let mut b = ModePicker::new(vec![0, 1, 2, 3, 4, 5], false, 7);
        for _ in 0..20 {
            assert_eq!(a.pick(), b.pick());
        }
    }

    #[test]
    fn test_picker_single_and_empty() {
        let mut single = ModePicker::new(vec![3], false, 1);
        assert_eq!(single.pick(), Some(3));
        assert_eq!(single.pick(), Some(3));

        let mut empty = ModePicker::new(Vec::new(), false, 1);
        assert_eq!(empty.pick(), None);
    }

    #[test]
    fn test_rotation_due_after_duration() {
        let start = Instant::now();
        let mut rotation = Rotation::new(
            ModePicker::new(vec![0, 1], true, 0),
            Duration::from_secs(60),
        );

        assert_eq!(rotation.poll(start), Some(0));
        assert_eq!(rotation.poll(start + Duration::from_secs(30)), None);
        assert_eq!(rotation.poll(start + Duration::from_secs(60)), Some(1));
    }

    #[test]
    fn test_rotation_zero_duration_keeps_first_pick() {
        let start = Instant::now();
        let mut rotation = Rotation::new(ModePicker::new(vec![0, 1], true, 0), Duration::ZERO);

        assert_eq!(rotation.poll(start), Some(0));
        assert_eq!(rotation.poll(start + Duration::from_secs(3600)), None);
    }
}
