//! Diagnostic types shared with the bundler.
//!
//! [`RawDiagnostic`] is whatever the compiler or preprocessor reported;
//! [`Diagnostic`] is the normalized form handed to the bundler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use velin_relief::{Position, RawLocation, RawPosition};

/// Code frame language tag for template sources.
pub const TEMPLATE_LANGUAGE: &str = "svelte";

/// Fallback message when the compiler reports none.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// A highlighted range inside a code frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHighlight {
    pub start: Position,
    pub end: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Source text with highlighted ranges, rendered by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFrame {
    pub file_path: PathBuf,
    /// Full source text the highlights refer to
    pub code: String,
    pub language: String,
    pub code_highlights: Vec<CodeHighlight>,
}

/// Normalized diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_frames: Option<Vec<CodeFrame>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    #[serde(
        default,
        rename = "documentationURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub documentation_url: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// First code frame, if any.
    pub fn first_code_frame(&self) -> Option<&CodeFrame> {
        self.code_frames.as_ref()?.first()
    }

    /// Render as plain text: message, location and hints on separate lines.
    pub fn render_plain(&self) -> String {
        let mut out = self.message.clone();
        if let Some(frame) = self.first_code_frame() {
            if let Some(highlight) = frame.code_highlights.first() {
                out.push_str(&format!(
                    "\n  --> {}:{}:{}",
                    frame.file_path.display(),
                    highlight.start.line,
                    highlight.start.column
                ));
            }
        }
        for hint in self.hints.iter().flatten() {
            for line in hint.lines() {
                out.push_str("\n  | ");
                out.push_str(line);
            }
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Error or warning object as produced by the compiler or preprocessor.
///
/// Every field is optional; positions are 0-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDiagnostic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<RawPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<RawPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(
        default,
        alias = "documentationUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub documentation_url: Option<String>,
}

impl RawDiagnostic {
    /// Create a raw diagnostic with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Attach a machine-readable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a 0-based location.
    pub fn with_location(mut self, start: RawPosition, end: RawPosition) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// The reported range, when both ends are present.
    pub fn location(&self) -> Option<RawLocation> {
        Some(RawLocation::new(self.start?, self.end?))
    }

    /// Check the machine-readable code.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl fmt::Display for RawDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_deref().unwrap_or(UNKNOWN_ERROR))?;
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for RawDiagnostic {}

/// Convenience view of the first code frame, for consumers that read flat
/// error fields instead of walking `code_frames`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Position>,
}

impl From<&Diagnostic> for FlatFields {
    fn from(diagnostic: &Diagnostic) -> Self {
        let Some(frame) = diagnostic.first_code_frame() else {
            return Self::default();
        };
        let highlight = frame.code_highlights.first();
        Self {
            source: Some(frame.code.clone()),
            file_path: Some(frame.file_path.clone()),
            start: highlight.map(|h| h.start),
            end: highlight.map(|h| h.end),
        }
    }
}

/// A fatal diagnostic, raised when a file cannot be transformed.
///
/// The flat view is derived from the structured diagnostic once, on
/// construction, and never edited independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrowableDiagnostic {
    diagnostic: Diagnostic,
    flat: FlatFields,
}

impl ThrowableDiagnostic {
    pub fn new(diagnostic: Diagnostic) -> Self {
        let flat = FlatFields::from(&diagnostic);
        Self { diagnostic, flat }
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }

    pub fn flat(&self) -> &FlatFields {
        &self.flat
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        self.diagnostic
    }

    /// JSON shape expected by JavaScript consumers: the diagnostic plus the
    /// flat fields, including their legacy aliases (`filename`, `loc`).
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut value = serde_json::json!({ "diagnostic": self.diagnostic });
        if let (serde_json::Value::Object(out), Ok(serde_json::Value::Object(flat))) =
            (&mut value, serde_json::to_value(&self.flat))
        {
            out.extend(flat);
            if let Some(path) = out.get("filePath").cloned() {
                out.insert("filename".into(), path);
            }
            if let Some(start) = out.get("start").cloned() {
                out.insert("loc".into(), start);
            }
        }
        value
    }
}

impl fmt::Display for ThrowableDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.message)
    }
}

impl std::error::Error for ThrowableDiagnostic {}

impl From<Diagnostic> for ThrowableDiagnostic {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::new(diagnostic)
    }
}
