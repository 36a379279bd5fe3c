//! Remapping of user-facing locations through a source map.

use crate::location::{Position, SourceLocation};
use crate::source_map::SourceMap;

/// Translate a 1-based location in generated code into the original source.
///
/// Start and end are looked up independently. When the start maps, its source
/// becomes the location's file. An end that does not map, or that maps before
/// the start, collapses onto the start; a single-line span that the map squashes
/// keeps its original width.
pub fn remap_source_location(location: SourceLocation, map: &SourceMap) -> SourceLocation {
    let SourceLocation {
        mut file_path,
        mut start,
        mut end,
    } = location;

    let line_diff = end.line.saturating_sub(start.line);
    let col_diff = end.column.saturating_sub(start.column);

    let start_mapping = map
        .find_closest_mapping(start.line, start.column.saturating_sub(1))
        .and_then(|m| m.original);
    let end_mapping = map
        .find_closest_mapping(end.line, end.column.saturating_sub(1))
        .and_then(|m| m.original);

    if let Some(orig) = start_mapping {
        if let Some(source) = map.source(orig.source) {
            file_path = map.project_root().join(source);
        }
        start = Position::new(orig.position.line, orig.position.column.saturating_add(1));
    }

    match end_mapping {
        Some(orig) => {
            end = Position::new(orig.position.line, orig.position.column.saturating_add(1));
            if end.line < start.line {
                end = start;
            } else if end.line == start.line && end.column <= start.column && line_diff == 0 {
                end.column = start.column.saturating_add(col_diff);
            }
        }
        None => end = start,
    }

    SourceLocation {
        file_path,
        start,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_map::RawSourceMap;
    use std::path::PathBuf;

    fn original_map(mappings: &str) -> SourceMap {
        SourceMap::from_raw(
            "/project",
            &RawSourceMap::new(vec!["src/Page.svelte".into()], mappings),
        )
        .unwrap()
    }

    #[test]
    fn test_remaps_into_original_file() {
        // generated line 1 col 0 -> original line 3 col 2
        let map = original_map("AAEE");
        let loc = SourceLocation::new("/project/out.svelte", Position::new(1, 1), Position::new(1, 5));

        let remapped = remap_source_location(loc, &map);

        assert_eq!(remapped.file_path, PathBuf::from("/project/src/Page.svelte"));
        assert_eq!(remapped.start, Position::new(3, 3));
        // End resolves to the same mapping, so the original width is kept
        assert_eq!(remapped.end, Position::new(3, 7));
    }

    #[test]
    fn test_unmapped_location_is_unchanged() {
        let map = original_map("AAAA");
        let loc = SourceLocation::new("/project/a.svelte", Position::new(4, 2), Position::new(4, 9));

        let remapped = remap_source_location(loc.clone(), &map);

        assert_eq!(remapped.file_path, loc.file_path);
        assert_eq!(remapped.start, loc.start);
        // Without an end mapping the range collapses onto the start
        assert_eq!(remapped.end, loc.start);
    }

    #[test]
    fn test_end_before_start_collapses() {
        // line 1 -> original line 5, line 2 -> original line 2
        let map = original_map("AAIA;AAGA");
        let loc = SourceLocation::new("/project/a.svelte", Position::new(1, 1), Position::new(2, 1));

        let remapped = remap_source_location(loc, &map);

        assert_eq!(remapped.start, Position::new(5, 1));
        assert_eq!(remapped.end, Position::new(5, 1));
    }

    #[test]
    fn test_huge_original_column_saturates() {
        let mut mappings = String::from("AAA");
        crate::vlq::encode(i64::from(u32::MAX), &mut mappings);
        let map = original_map(&mappings);
        let loc = SourceLocation::new("/project/a.svelte", Position::new(1, 1), Position::new(1, 1));

        let remapped = remap_source_location(loc, &map);

        assert_eq!(remapped.start, Position::new(1, u32::MAX));
        assert_eq!(remapped.end, Position::new(1, u32::MAX));
    }

    #[test]
    fn test_multi_line_span_is_preserved() {
        // line 1 -> original line 1, line 2 -> original line 2
        let map = original_map("AAAA;AACA");
        let loc = SourceLocation::new("/project/a.svelte", Position::new(1, 1), Position::new(2, 4));

        let remapped = remap_source_location(loc, &map);

        assert_eq!(remapped.start, Position::new(1, 1));
        assert_eq!(remapped.end, Position::new(2, 1));
    }
}
