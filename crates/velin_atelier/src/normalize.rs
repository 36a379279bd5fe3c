//! Normalization of compiler-reported locations and diagnostics.

use std::path::Path;
use velin_relief::{remap_source_location, Position, RawLocation, SourceLocation, SourceMap};

use crate::diagnostic::{
    CodeFrame, CodeHighlight, Diagnostic, RawDiagnostic, ThrowableDiagnostic, TEMPLATE_LANGUAGE,
    UNKNOWN_ERROR,
};

/// Converts 0-based compiler locations into 1-based locations in the file the
/// user wrote.
#[derive(Debug, Clone, Copy)]
pub struct LocationRemapper<'a> {
    file_path: &'a Path,
    /// 1-based line where this fragment starts in the enclosing document
    start_line: u32,
    original_map: Option<&'a SourceMap>,
}

impl<'a> LocationRemapper<'a> {
    pub fn new(
        file_path: &'a Path,
        start_line: Option<u32>,
        original_map: Option<&'a SourceMap>,
    ) -> Self {
        Self {
            file_path,
            start_line: start_line.unwrap_or(1).max(1),
            original_map,
        }
    }

    pub fn convert(&self, raw: &RawLocation) -> SourceLocation {
        // `start_line` is 1-based, so the offset and the 1-based shift cancel
        let line = |raw_line: u32| raw_line.saturating_add(self.start_line);
        let location = SourceLocation::new(
            self.file_path,
            Position::new(line(raw.start.line), raw.start.column.saturating_add(1)),
            Position::new(line(raw.end.line), raw.end.column.saturating_add(1)),
        );

        match self.original_map {
            Some(map) => remap_source_location(location, map),
            None => location,
        }
    }
}

/// Builds [`Diagnostic`]s from raw compiler errors and warnings.
///
/// Code frames carry `code`, the text the reporting stage actually saw.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticNormalizer<'a> {
    remapper: LocationRemapper<'a>,
    file_path: &'a Path,
    code: &'a str,
}

impl<'a> DiagnosticNormalizer<'a> {
    pub fn new(remapper: LocationRemapper<'a>, file_path: &'a Path, code: &'a str) -> Self {
        Self {
            remapper,
            file_path,
            code,
        }
    }

    /// Normalize a warning or error.
    pub fn convert_diagnostic(&self, raw: &RawDiagnostic) -> Diagnostic {
        let mut message = non_empty(&raw.message)
            .unwrap_or(UNKNOWN_ERROR)
            .to_string();
        if let Some(code) = non_empty(&raw.code) {
            message = format!("{} ({})", message, code);
        }

        let code_frames = raw.location().map(|raw_loc| {
            let location = self.remapper.convert(&raw_loc);
            vec![CodeFrame {
                file_path: self.file_path.to_path_buf(),
                code: self.code.to_string(),
                language: TEMPLATE_LANGUAGE.to_string(),
                code_highlights: vec![CodeHighlight {
                    start: location.start,
                    end: location.end,
                    message: None,
                }],
            }]
        });

        Diagnostic {
            message,
            hints: non_empty(&raw.frame).map(|frame| vec![frame.to_string()]),
            code_frames,
            name: non_empty(&raw.name).map(str::to_string),
            stack: non_empty(&raw.stack).map(str::to_string),
            documentation_url: non_empty(&raw.documentation_url).map(str::to_string),
        }
    }

    /// Normalize a fatal error into a throwable failure.
    pub fn convert_error(&self, raw: &RawDiagnostic) -> ThrowableDiagnostic {
        ThrowableDiagnostic::new(self.convert_diagnostic(raw))
    }
}

/// Compilers leave fields blank as often as they omit them.
fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}
