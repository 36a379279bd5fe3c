//! Path helpers shared by the transformer.
//!
//! File names handed to the compiler and written into source maps are always
//! project-relative and `/`-separated, regardless of platform.

use serde::Serialize;
use std::path::{Component, Path};

/// Directory segment that holds installed third-party packages.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Conventional first-party source directory. A dependency directory nested
/// below it (e.g. a vendored workspace package) still counts as first-party.
pub const FIRST_PARTY_DIR: &str = "src";

/// Where a file comes from, as far as diagnostics are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileOrigin {
    /// Code owned by the project.
    FirstParty,
    /// Code installed from a package registry.
    External,
}

impl FileOrigin {
    #[inline]
    pub fn is_external(self) -> bool {
        matches!(self, Self::External)
    }
}

/// Express `file_path` relative to `project_root`, using `/` separators.
///
/// Paths outside the project root are returned unchanged apart from
/// separator normalization.
pub fn relative_url(project_root: &Path, file_path: &Path) -> String {
    let relative = file_path.strip_prefix(project_root).unwrap_or(file_path);
    let mut out = String::new();
    for component in relative.components() {
        match component {
            Component::RootDir => out.push('/'),
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::CurDir => {}
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Classify a project-relative path.
///
/// The first `node_modules` segment marks the file as external, unless a
/// `src` segment precedes it.
pub fn classify_file_origin(relative_path: &str) -> FileOrigin {
    let segments: Vec<&str> = relative_path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();

    let Some(dep_index) = segments.iter().position(|s| *s == DEPENDENCY_DIR) else {
        return FileOrigin::FirstParty;
    };

    if segments[..dep_index].contains(&FIRST_PARTY_DIR) {
        FileOrigin::FirstParty
    } else {
        FileOrigin::External
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_url_inside_root() {
        let rel = relative_url(Path::new("/work/app"), Path::new("/work/app/src/App.svelte"));
        assert_eq!(rel, "src/App.svelte");
    }

    #[test]
    fn test_relative_url_outside_root() {
        let rel = relative_url(Path::new("/work/app"), Path::new("/other/Card.svelte"));
        assert_eq!(rel, "/other/Card.svelte");
    }

    #[test]
    fn test_plain_source_is_first_party() {
        assert_eq!(classify_file_origin("src/App.svelte"), FileOrigin::FirstParty);
        assert_eq!(classify_file_origin("App.svelte"), FileOrigin::FirstParty);
    }

    #[test]
    fn test_dependency_is_external() {
        assert_eq!(
            classify_file_origin("node_modules/ui-kit/src/Button.svelte"),
            FileOrigin::External
        );
        assert_eq!(
            classify_file_origin("packages/web/node_modules/ui/Card.svelte"),
            FileOrigin::External
        );
    }

    #[test]
    fn test_dependency_under_src_is_first_party() {
        assert_eq!(
            classify_file_origin("src/node_modules/local/Widget.svelte"),
            FileOrigin::FirstParty
        );
    }

    #[test]
    fn test_segment_must_match_exactly() {
        assert_eq!(
            classify_file_origin("my_node_modules/Widget.svelte"),
            FileOrigin::FirstParty
        );
        assert_eq!(
            classify_file_origin("srcs/node_modules/x/Widget.svelte"),
            FileOrigin::External
        );
    }
}
