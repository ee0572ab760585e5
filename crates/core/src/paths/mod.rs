//! On-storage path definitions for units.
//!
//! This module maps unit identifiers to storage paths.
//! It contains **no I/O logic** - only typed path construction.

mod location;

pub use location::{escape_id_component, escaped_len, unescape_id_component, Location};
