//! Mode system for mode-host
//!
//! A mode is a self-contained visual behavior exposing lifecycle hooks.
//! This module provides:
//! - Descriptors for every available mode, with option schema and defaults
//! - A sorted, write-once registry shared by all screens
//! - A per-screen controller that keeps exactly one mode live
//! - Mode list parsing and random/sequential rotation
//!
//! # Architecture
//!
//! - **Data types** (`types.rs`): option schema, numeric defaults, run settings
//! - **Traits** (`traits.rs`): `ModeHooks` trait implemented by every mode,
//!   `ModeInfo` handed to each hook
//! - **Descriptor** (`descriptor.rs`): metadata plus hook table of one mode
//! - **Registry** (`registry.rs`): sorted set of descriptors
//! - **Controller** (`controller.rs`): per-screen lifecycle state machine
//! - **Selection** (`selection.rs`): mode lists, picker, rotation
//! - **Builtin** (`builtin/`): compiled-in modes
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use mode_host::modes::{builtin, ModeController};
//!
//! let registry = builtin::builtin_registry();
//! let snow = Arc::clone(registry.find_by_name("snow").unwrap());
//!
//! let mut screen = ModeController::new(0, 64, 48);
//! screen.select_mode(&snow);
//! screen.step();
//! screen.repaint();
//! ```

mod types;
mod traits;
mod descriptor;
mod registry;
mod controller;
mod selection;
pub mod builtin;

pub use types::*;
pub use traits::*;
pub use descriptor::*;
pub use registry::*;
pub use controller::*;
pub use selection::*;
