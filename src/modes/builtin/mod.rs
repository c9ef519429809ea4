//! Built-in modes
//!
//! The compiled-in mode table used when no plugin images are loaded.

mod blank;
mod snow;

pub use blank::BlankMode;
pub use snow::SnowMode;

use super::{ModeDescriptor, ModeRegistry};

pub(crate) const BLANK: &str = super::selection::BLANK_MODE;

/// The compiled-in mode table, in name order
pub fn static_table() -> Vec<ModeDescriptor> {
    vec![BlankMode::descriptor(), SnowMode::descriptor()]
}

/// Registry holding only the built-in modes
pub fn builtin_registry() -> ModeRegistry {
    ModeRegistry::from_static(static_table())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::ModeInfo;

    #[test]
    fn test_static_table_is_sorted() {
        let table = static_table();
        let names: Vec<_> = table.iter().map(|m| m.name().to_string()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["blank", "snow"]);

        let mut mi = ModeInfo::new(0, 2, 2);
        assert!(registry.find_by_name("blank").unwrap().hooks().refresh(&mut mi));
        assert!(!registry.find_by_name("snow").unwrap().hooks().refresh(&mut mi));
    }
}
