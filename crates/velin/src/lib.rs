//! # Velin
//!
//! Svelte components for Rust-driven build pipelines.
//!
//! This crate re-exports the Velin sub-crates and provides the
//! filesystem-backed collaborators used by the `velin` command line tool.
//!
//! ## Crates
//!
//! - [`carton`] - Hashing and path classification
//! - [`relief`] - Source locations and source maps
//! - [`atelier`] - Config resolution, diagnostics and the transform pipeline
//! - [`passage`] - Node.js bridge to the Svelte compiler

/// Hashing and path classification.
pub use velin_carton as carton;

/// Source locations and source maps.
pub use velin_relief as relief;

/// Config resolution, diagnostics and the transform pipeline.
pub use velin_atelier as atelier;

/// Node.js bridge to the Svelte compiler.
pub use velin_passage as passage;

pub mod fs;

pub use fs::{FsAsset, FsConfigProvider};
