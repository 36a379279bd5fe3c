//! Carton - The artist's toolbox for Velin.
//!
//! This crate provides the small shared utilities the other Velin crates lean on,
//! much like a carton (artist's portfolio case) holds the tools an artist
//! carries from one workshop to the next.
//!
//! # Modules
//!
//! - **hash**: Content hashing for cache keys
//! - **path**: Project-relative paths and file origin classification
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use velin_carton::path::{classify_file_origin, relative_url, FileOrigin};
//!
//! let relative = relative_url(Path::new("/app"), Path::new("/app/node_modules/ui/Button.svelte"));
//! assert_eq!(relative, "node_modules/ui/Button.svelte");
//! assert_eq!(classify_file_origin(&relative), FileOrigin::External);
//! ```

pub mod hash;
pub mod path;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};
