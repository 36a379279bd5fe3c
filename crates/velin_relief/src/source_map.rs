//! Source map model with composition support.
//!
//! Generated lines are 1-based and columns 0-based, the convention bundlers use
//! for their source map APIs. The VLQ payload itself is 0-based on both axes;
//! conversion happens at the ingest/encode boundary only.
//!
//! The interesting operation is [`SourceMap::extends`]: given this map
//! (output → intermediate) and an upstream map (intermediate → original), it
//! rewrites every mapping so that it points straight at the original file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use velin_carton::path::relative_url;
use velin_carton::FxHashMap;

use crate::error::{SourceMapError, SourceMapResult};
use crate::vlq;

/// A v3 source map payload, exactly as compilers emit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSourceMap {
    #[serde(default = "default_version")]
    pub version: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,

    #[serde(default)]
    pub names: Vec<String>,

    pub mappings: String,
}

fn default_version() -> u8 {
    3
}

impl RawSourceMap {
    /// Create a minimal payload.
    pub fn new(sources: Vec<String>, mappings: impl Into<String>) -> Self {
        Self {
            version: 3,
            file: None,
            source_root: None,
            sources,
            sources_content: None,
            names: Vec::new(),
            mappings: mappings.into(),
        }
    }

    /// Parse a payload from JSON text.
    pub fn from_json(json: &str) -> SourceMapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a payload from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> SourceMapResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// A generated-side position: 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MapPosition {
    pub line: u32,
    pub column: u32,
}

impl MapPosition {
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// The original side of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OriginalMapping {
    /// Position in the original source (1-based line, 0-based column)
    pub position: MapPosition,
    /// Index into [`SourceMap::sources`]
    pub source: u32,
    /// Index into [`SourceMap::names`]
    pub name: Option<u32>,
}

/// One mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub generated: MapPosition,
    pub original: Option<OriginalMapping>,
}

/// Source map owned by a single output unit.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    project_root: PathBuf,
    file: Option<String>,
    sources: Vec<String>,
    sources_content: Vec<Option<String>>,
    names: Vec<String>,
    source_indices: FxHashMap<String, u32>,
    name_indices: FxHashMap<String, u32>,
    /// Mappings grouped by generated line (index 0 is line 1), sorted by column.
    lines: Vec<Vec<Mapping>>,
}

impl SourceMap {
    /// Create an empty map whose sources are kept relative to `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            ..Default::default()
        }
    }

    /// Create a map from a single raw payload.
    pub fn from_raw(project_root: impl Into<PathBuf>, raw: &RawSourceMap) -> SourceMapResult<Self> {
        let mut map = Self::new(project_root);
        map.add_vlq_map(raw)?;
        Ok(map)
    }

    /// Project root used to relativize sources.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Declared sources, project-relative where possible.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Embedded source contents, parallel to [`Self::sources`].
    pub fn sources_content(&self) -> &[Option<String>] {
        &self.sources_content
    }

    /// Declared symbol names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Resolve a source index to its name.
    pub fn source(&self, index: u32) -> Option<&str> {
        self.sources.get(index as usize).map(String::as_str)
    }

    /// Iterate all mappings in generated order.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.lines.iter().flatten()
    }

    /// Check if the map holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(Vec::is_empty)
    }

    /// Ingest a raw v3 payload, merging it with any mappings already present.
    pub fn add_vlq_map(&mut self, raw: &RawSourceMap) -> SourceMapResult<()> {
        if self.file.is_none() {
            self.file = raw.file.clone();
        }

        let source_ids: Vec<u32> = raw
            .sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let content = raw
                    .sources_content
                    .as_ref()
                    .and_then(|c| c.get(i).cloned().flatten());
                let name = self.normalize_source(raw.source_root.as_deref(), source);
                self.add_source(name, content)
            })
            .collect();
        let name_ids: Vec<u32> = raw.names.iter().map(|n| self.add_name(n)).collect();

        let mut source = 0i64;
        let mut orig_line = 0i64;
        let mut orig_col = 0i64;
        let mut name = 0i64;

        for (line_idx, line) in raw.mappings.split(';').enumerate() {
            let mut gen_col = 0i64;

            for segment in line.split(',').filter(|s| !s.is_empty()) {
                let fields = vlq::decode_segment(segment)?;
                let negative = || SourceMapError::NegativePosition {
                    segment: segment.to_string(),
                };

                gen_col += fields[0];
                let generated = MapPosition::new(
                    line_idx as u32 + 1,
                    u32::try_from(gen_col).map_err(|_| negative())?,
                );

                let original = match fields.len() {
                    1 => None,
                    4 | 5 => {
                        source += fields[1];
                        orig_line += fields[2];
                        orig_col += fields[3];

                        let source_id = usize::try_from(source)
                            .ok()
                            .and_then(|s| source_ids.get(s))
                            .copied()
                            .ok_or(SourceMapError::UnknownSource {
                                index: source,
                                len: source_ids.len(),
                            })?;

                        let name_id = if fields.len() == 5 {
                            name += fields[4];
                            Some(
                                usize::try_from(name)
                                    .ok()
                                    .and_then(|n| name_ids.get(n))
                                    .copied()
                                    .ok_or(SourceMapError::UnknownName {
                                        index: name,
                                        len: name_ids.len(),
                                    })?,
                            )
                        } else {
                            None
                        };

                        Some(OriginalMapping {
                            position: MapPosition::new(
                                u32::try_from(orig_line + 1).map_err(|_| negative())?,
                                u32::try_from(orig_col).map_err(|_| negative())?,
                            ),
                            source: source_id,
                            name: name_id,
                        })
                    }
                    n => {
                        return Err(SourceMapError::InvalidSegment {
                            segment: segment.to_string(),
                            fields: n,
                        })
                    }
                };

                self.push_mapping(Mapping {
                    generated,
                    original,
                });
            }
        }

        // Trailing lines without segments still count
        self.reserve_lines(raw.mappings.split(';').count());
        for line in &mut self.lines {
            line.sort_by_key(|m| m.generated.column);
        }
        Ok(())
    }

    /// Find the mapping that covers a generated position.
    ///
    /// Picks the mapping on `line` with the greatest column not after `column`.
    /// When every mapping on the line starts after `column`, the first one is
    /// used. Returns `None` for lines without mappings.
    pub fn find_closest_mapping(&self, line: u32, column: u32) -> Option<Mapping> {
        let mappings = self.lines.get(line.checked_sub(1)? as usize)?;
        let first = mappings.first()?;
        let idx = mappings.partition_point(|m| m.generated.column <= column);
        Some(if idx == 0 { *first } else { mappings[idx - 1] })
    }

    /// Compose this map with an upstream map.
    ///
    /// `self` maps final output to intermediate code; `upstream` maps that
    /// intermediate code to the original. Afterwards `self` maps final output
    /// directly to the original. Mappings whose intermediate position has no
    /// upstream counterpart lose their original side.
    pub fn extends(&mut self, upstream: &SourceMap) {
        let lines = std::mem::take(&mut self.lines);
        let line_count = lines.len();
        let own_names = std::mem::take(&mut self.names);

        self.sources.clear();
        self.sources_content.clear();
        self.source_indices.clear();
        self.name_indices.clear();

        for line in lines {
            for mapping in line {
                let original = mapping.original.and_then(|orig| {
                    let upstream_orig = upstream
                        .find_closest_mapping(orig.position.line, orig.position.column)?
                        .original?;

                    let source_name = upstream.sources.get(upstream_orig.source as usize)?;
                    let content = upstream
                        .sources_content
                        .get(upstream_orig.source as usize)
                        .cloned()
                        .flatten();
                    let source = self.add_source(source_name.clone(), content);

                    let name = upstream_orig
                        .name
                        .and_then(|n| upstream.names.get(n as usize))
                        .or_else(|| orig.name.and_then(|n| own_names.get(n as usize)))
                        .cloned()
                        .map(|n| self.add_name(&n));

                    Some(OriginalMapping {
                        position: upstream_orig.position,
                        source,
                        name,
                    })
                });

                self.push_mapping(Mapping {
                    generated: mapping.generated,
                    original,
                });
            }
        }
        self.reserve_lines(line_count);
    }

    /// Encode back to a v3 payload.
    pub fn to_raw(&self) -> RawSourceMap {
        let mut mappings = String::new();
        let mut prev_source = 0i64;
        let mut prev_orig_line = 0i64;
        let mut prev_orig_col = 0i64;
        let mut prev_name = 0i64;

        for (line_idx, line) in self.lines.iter().enumerate() {
            if line_idx > 0 {
                mappings.push(';');
            }
            let mut prev_gen_col = 0i64;

            for (i, mapping) in line.iter().enumerate() {
                if i > 0 {
                    mappings.push(',');
                }
                let gen_col = mapping.generated.column as i64;
                vlq::encode(gen_col - prev_gen_col, &mut mappings);
                prev_gen_col = gen_col;

                if let Some(orig) = mapping.original {
                    let source = orig.source as i64;
                    let orig_line = orig.position.line as i64 - 1;
                    let orig_col = orig.position.column as i64;
                    vlq::encode(source - prev_source, &mut mappings);
                    vlq::encode(orig_line - prev_orig_line, &mut mappings);
                    vlq::encode(orig_col - prev_orig_col, &mut mappings);
                    prev_source = source;
                    prev_orig_line = orig_line;
                    prev_orig_col = orig_col;

                    if let Some(name) = orig.name {
                        vlq::encode(name as i64 - prev_name, &mut mappings);
                        prev_name = name as i64;
                    }
                }
            }
        }

        let sources_content = self
            .sources_content
            .iter()
            .any(Option::is_some)
            .then(|| self.sources_content.clone());

        RawSourceMap {
            version: 3,
            file: self.file.clone(),
            source_root: None,
            sources: self.sources.clone(),
            sources_content,
            names: self.names.clone(),
            mappings,
        }
    }

    /// Encode to v3 JSON text.
    pub fn to_json(&self) -> SourceMapResult<String> {
        Ok(serde_json::to_string(&self.to_raw())?)
    }

    fn normalize_source(&self, source_root: Option<&str>, source: &str) -> String {
        let joined = match source_root {
            Some(root) if !root.is_empty() => {
                format!("{}/{}", root.trim_end_matches('/'), source)
            }
            _ => source.to_string(),
        };
        let path = Path::new(&joined);
        if path.is_absolute() && path.starts_with(&self.project_root) {
            relative_url(&self.project_root, path)
        } else {
            joined
        }
    }

    fn add_source(&mut self, name: String, content: Option<String>) -> u32 {
        if let Some(&idx) = self.source_indices.get(&name) {
            if content.is_some() && self.sources_content[idx as usize].is_none() {
                self.sources_content[idx as usize] = content;
            }
            return idx;
        }
        let idx = self.sources.len() as u32;
        self.source_indices.insert(name.clone(), idx);
        self.sources.push(name);
        self.sources_content.push(content);
        idx
    }

    fn add_name(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.name_indices.get(name) {
            return idx;
        }
        let idx = self.names.len() as u32;
        self.name_indices.insert(name.to_string(), idx);
        self.names.push(name.to_string());
        idx
    }

    fn push_mapping(&mut self, mapping: Mapping) {
        let line_idx = mapping.generated.line as usize - 1;
        self.reserve_lines(line_idx + 1);
        self.lines[line_idx].push(mapping);
    }

    fn reserve_lines(&mut self, count: usize) {
        if self.lines.len() < count {
            self.lines.resize_with(count, Vec::new);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(sources: &[&str], mappings: &str) -> SourceMap {
        let raw = RawSourceMap::new(sources.iter().map(|s| s.to_string()).collect(), mappings);
        SourceMap::from_raw("/project", &raw).unwrap()
    }

    /// Resolve a generated position to (source, line, column).
    fn resolve(map: &SourceMap, line: u32, column: u32) -> Option<(String, u32, u32)> {
        let orig = map.find_closest_mapping(line, column)?.original?;
        Some((
            map.source(orig.source)?.to_string(),
            orig.position.line,
            orig.position.column,
        ))
    }

    /// Build a map from explicit (generated, original) pairs into `source`.
    fn map_from_pairs(source: &str, pairs: &[((u32, u32), (u32, u32))]) -> SourceMap {
        let mut out = SourceMap::new("/project");
        let idx = out.add_source(source.to_string(), None);
        for &((gl, gc), (ol, oc)) in pairs {
            out.push_mapping(Mapping {
                generated: MapPosition::new(gl, gc),
                original: Some(OriginalMapping {
                    position: MapPosition::new(ol, oc),
                    source: idx,
                    name: None,
                }),
            });
        }
        for line in &mut out.lines {
            line.sort_by_key(|m| m.generated.column);
        }
        out
    }

    #[test]
    fn test_decode_lines_and_columns() {
        // line 1: col 0 -> (1,0); col 4 -> (1,4)
        // line 2: col 2 -> (2,0)
        let map = map(&["App.svelte"], "AAAA,IAAI;EACJ");
        assert_eq!(resolve(&map, 1, 0), Some(("App.svelte".into(), 1, 0)));
        assert_eq!(resolve(&map, 1, 6), Some(("App.svelte".into(), 1, 4)));
        assert_eq!(resolve(&map, 2, 2), Some(("App.svelte".into(), 2, 0)));
        assert_eq!(resolve(&map, 3, 0), None);
    }

    #[test]
    fn test_closest_mapping_falls_back_to_first_on_line() {
        let map = map(&["App.svelte"], "IAAA");
        let mapping = map.find_closest_mapping(1, 0).unwrap();
        assert_eq!(mapping.generated, MapPosition::new(1, 4));
    }

    #[test]
    fn test_generated_only_segments() {
        let map = map(&["App.svelte"], "A,CAAA");
        assert!(map.find_closest_mapping(1, 0).unwrap().original.is_none());
        assert!(map.find_closest_mapping(1, 1).unwrap().original.is_some());
    }

    #[test]
    fn test_invalid_segments() {
        let raw = RawSourceMap::new(vec!["a".into()], "AA");
        assert!(matches!(
            SourceMap::from_raw("/", &raw),
            Err(SourceMapError::InvalidSegment { fields: 2, .. })
        ));

        let raw = RawSourceMap::new(vec!["a".into()], "ACAA");
        assert!(matches!(
            SourceMap::from_raw("/", &raw),
            Err(SourceMapError::UnknownSource { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_absolute_sources_become_project_relative() {
        let raw = RawSourceMap::new(vec!["/project/src/App.svelte".into()], "AAAA");
        let map = SourceMap::from_raw("/project", &raw).unwrap();
        assert_eq!(map.sources(), ["src/App.svelte"]);

        let mut raw = RawSourceMap::new(vec!["App.svelte".into()], "AAAA");
        raw.source_root = Some("lib/".into());
        let map = SourceMap::from_raw("/project", &raw).unwrap();
        assert_eq!(map.sources(), ["lib/App.svelte"]);
    }

    #[test]
    fn test_to_raw_reproduces_input() {
        let mut raw = RawSourceMap::new(vec!["App.svelte".into()], "AAAA,IAAIA;;EACJ,CAACC");
        raw.names = vec!["count".into(), "increment".into()];
        let map = SourceMap::from_raw("/project", &raw).unwrap();
        assert_eq!(map.to_raw(), raw);
    }

    #[test]
    fn test_trailing_empty_lines_survive() {
        let raw = RawSourceMap::new(vec!["App.svelte".into()], "AAAA;;");
        let mut map = SourceMap::from_raw("/project", &raw).unwrap();
        assert_eq!(map.to_raw().mappings, "AAAA;;");

        map.extends(&map_from_pairs("Page.md", &[((1, 0), (4, 0))]));
        assert_eq!(map.to_raw().mappings, "AAGA;;");
        assert_eq!(resolve(&map, 1, 0), Some(("Page.md".into(), 4, 0)));
    }

    #[test]
    fn test_extends_points_to_original() {
        // output (1,10) -> intermediate (3,2) -> original (5,0)
        let mut compiled = map_from_pairs("intermediate.svelte", &[((1, 10), (3, 2))]);
        let preprocessed = map_from_pairs("App.svelte", &[((3, 0), (5, 0))]);

        compiled.extends(&preprocessed);

        assert_eq!(resolve(&compiled, 1, 10), Some(("App.svelte".into(), 5, 0)));
        assert_eq!(compiled.sources(), ["App.svelte"]);
    }

    #[test]
    fn test_extends_drops_unmapped_originals() {
        let mut compiled = map_from_pairs("mid", &[((1, 0), (1, 0)), ((2, 0), (9, 0))]);
        let upstream = map_from_pairs("orig", &[((1, 0), (4, 2))]);

        compiled.extends(&upstream);

        assert_eq!(resolve(&compiled, 1, 0), Some(("orig".into(), 4, 2)));
        let second = compiled.find_closest_mapping(2, 0).unwrap();
        assert_eq!(second.generated, MapPosition::new(2, 0));
        assert!(second.original.is_none());
    }

    #[test]
    fn test_extends_carries_names_and_content() {
        let mut raw = RawSourceMap::new(vec!["App.svelte".into()], "AAAAA");
        raw.names = vec!["count".into()];
        raw.sources_content = Some(vec![Some("<script>let count</script>".into())]);
        let upstream = SourceMap::from_raw("/project", &raw).unwrap();

        let mut compiled = map_from_pairs("mid", &[((1, 0), (1, 0))]);
        compiled.extends(&upstream);

        let orig = compiled.find_closest_mapping(1, 0).unwrap().original.unwrap();
        assert_eq!(compiled.names()[orig.name.unwrap() as usize], "count");
        assert_eq!(
            compiled.sources_content()[orig.source as usize].as_deref(),
            Some("<script>let count</script>")
        );
    }

    #[test]
    fn test_three_stage_chain_matches_stepwise_resolution() {
        let compiled_pairs = [((1, 0), (1, 0)), ((1, 8), (2, 4)), ((2, 3), (3, 1))];
        let preprocess_pairs = [((1, 0), (1, 2)), ((2, 4), (4, 0)), ((3, 1), (6, 3))];
        let original_pairs = [((1, 2), (10, 0)), ((4, 0), (12, 5)), ((6, 3), (20, 1))];

        let compiled = map_from_pairs("mid2", &compiled_pairs);
        let preprocessed = map_from_pairs("mid1", &preprocess_pairs);
        let original = map_from_pairs("App.svelte", &original_pairs);

        // (compiled ∘ preprocessed) ∘ original
        let mut left = compiled.clone();
        left.extends(&preprocessed);
        left.extends(&original);

        // compiled ∘ (preprocessed ∘ original)
        let mut inner = preprocessed.clone();
        inner.extends(&original);
        let mut right = compiled.clone();
        right.extends(&inner);

        for &((line, column), _) in &compiled_pairs {
            let stepwise = resolve(&compiled, line, column)
                .and_then(|(_, l, c)| resolve(&preprocessed, l, c))
                .and_then(|(_, l, c)| resolve(&original, l, c));

            assert!(stepwise.is_some());
            assert_eq!(resolve(&left, line, column), stepwise);
            assert_eq!(resolve(&right, line, column), stepwise);
        }
        assert_eq!(left.to_raw().mappings, right.to_raw().mappings);
    }
}
