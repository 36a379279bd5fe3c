//! Relief - The raised surface of Velin.
//!
//! Everything position-shaped lives here: 1-based source locations as shown
//! to users, the 0-based coordinates compilers report, and the source maps
//! that tie generated output back to the file a user actually wrote.
//!
//! # Example
//!
//! ```
//! use velin_relief::{RawSourceMap, SourceMap};
//!
//! let raw = RawSourceMap::new(vec!["App.svelte".into()], "AAAA;AACA");
//! let map = SourceMap::from_raw("/app", &raw).unwrap();
//! let mapping = map.find_closest_mapping(2, 0).unwrap();
//! assert_eq!(mapping.original.unwrap().position.line, 2);
//! ```

mod error;
pub mod location;
pub mod remap;
pub mod source_map;
pub mod vlq;

pub use error::{SourceMapError, SourceMapResult};
pub use location::{Position, RawLocation, RawPosition, SourceLocation};
pub use remap::remap_source_location;
pub use source_map::{MapPosition, Mapping, OriginalMapping, RawSourceMap, SourceMap};
