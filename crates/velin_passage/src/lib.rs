//! Passage - The way through to Node.js.
//!
//! The Svelte compiler and its preprocessors live in the JavaScript
//! ecosystem. This crate reaches them by running `node` with a small
//! embedded script, one short-lived process per call, and implements the
//! `velin_atelier` collaborator traits on top of it.
//!
//! - [`NodeBridge`]: [`Compiler`](velin_atelier::Compiler) and
//!   [`Preprocessor`](velin_atelier::Preprocessor)
//! - [`ScriptConfigEvaluator`]: evaluates `svelte.config.js`
//! - [`SveltePreprocessPreset`]: default preprocessing when installed

pub mod bridge;
mod compiler;
pub mod config;
pub mod preset;

pub use bridge::{BridgeError, NodeBridge, BRIDGE_SCRIPT, NODE_ENV_VAR};
pub use config::ScriptConfigEvaluator;
pub use preset::{SveltePreprocessPreset, SVELTE_PREPROCESS};
