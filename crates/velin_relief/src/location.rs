//! Source positions and locations.
//!
//! Two coordinate systems meet here:
//! - [`RawPosition`]: what the compiler reports (0-based line and column)
//! - [`Position`]: what users and bundlers see (1-based line and column)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A 1-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-based)
    pub line: u32,
    /// Column number (1-based)
    pub column: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A range in a specific file, 1-based on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    /// File the range belongs to
    pub file_path: PathBuf,
    /// Start position (inclusive)
    pub start: Position,
    /// End position
    pub end: Position,
}

impl SourceLocation {
    pub fn new(file_path: impl Into<PathBuf>, start: Position, end: Position) -> Self {
        Self {
            file_path: file_path.into(),
            start,
            end,
        }
    }
}

/// A 0-based line/column position, as reported by the compiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosition {
    /// Line number (0-based)
    pub line: u32,
    /// Column number (0-based)
    #[serde(alias = "col")]
    pub column: u32,
}

impl RawPosition {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A compiler-reported range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLocation {
    pub start: RawPosition,
    pub end: RawPosition,
}

impl RawLocation {
    #[inline]
    pub const fn new(start: RawPosition, end: RawPosition) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_position_accepts_col_alias() {
        let pos: RawPosition = serde_json::from_str(r#"{"line": 2, "col": 3}"#).unwrap();
        assert_eq!(pos, RawPosition::new(2, 3));

        let pos: RawPosition = serde_json::from_str(r#"{"line": 4, "column": 1}"#).unwrap();
        assert_eq!(pos, RawPosition::new(4, 1));
    }

    #[test]
    fn test_source_location_serializes_camel_case() {
        let loc = SourceLocation::new("App.svelte", Position::new(1, 1), Position::new(1, 6));
        let json = serde_json::to_string(&loc).unwrap();
        insta::assert_snapshot!(json, @r#"{"filePath":"App.svelte","start":{"line":1,"column":1},"end":{"line":1,"column":6}}"#);
    }
}
