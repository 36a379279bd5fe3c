//! Atelier - The workshop where templates become bundle output.
//!
//! This crate adapts an external template compiler to a bundler's asset
//! pipeline:
//!
//! - [`config`]: resolves project configuration into per-file compiler options
//! - [`transform`]: runs preprocess → compile for one asset and composes source maps
//! - [`normalize`]: turns raw compiler errors/warnings into [`Diagnostic`]s
//!
//! The compiler, preprocessor, asset store and logger are collaborators
//! reached through the traits in [`host`]; nothing here talks to a process
//! or the filesystem directly.

pub mod config;
pub mod diagnostic;
pub mod host;
pub mod normalize;
pub mod transform;

pub use config::{
    BuildMode, CompilerOptions, ConfigError, ConfigFile, ConfigProvider, ConfigResolver,
    ModuleFormat, PreprocessPreset, PreprocessStep, ResolvedConfig,
};
pub use diagnostic::{
    CodeFrame, CodeHighlight, Diagnostic, FlatFields, RawDiagnostic, ThrowableDiagnostic,
};
pub use host::{
    Asset, AssetError, CompileOutput, Compiler, GeneratedModule, Logger, PreprocessOutput,
    Preprocessor, TracingLogger,
};
pub use normalize::{DiagnosticNormalizer, LocationRemapper};
pub use transform::{
    CollectingLogger, OutputKind, OutputUnit, TransformContext, TransformError, TransformPipeline,
};
