//! Terminal rendering of diagnostics.

use ariadne::{Color, Label, Report, ReportKind, Source};
use velin_atelier::Diagnostic;
use velin_relief::Position;

/// Character offset of a 1-based position in `code`, clamped to the text.
pub fn char_offset(code: &str, position: Position) -> usize {
    let mut offset = 0;
    for (index, line) in code.split_inclusive('\n').enumerate() {
        let len = line.trim_end_matches('\n').chars().count();
        if index + 1 == position.line as usize {
            return offset + (position.column.saturating_sub(1) as usize).min(len);
        }
        offset += line.chars().count();
    }
    offset
}

/// Print a diagnostic to stderr, with a code frame when it has one.
pub fn print(kind: ReportKind<'_>, diagnostic: &Diagnostic) {
    let color = match kind {
        ReportKind::Error => Color::Red,
        _ => Color::Yellow,
    };

    let frame = diagnostic
        .first_code_frame()
        .and_then(|frame| Some((frame, frame.code_highlights.first()?)));
    let Some((frame, highlight)) = frame else {
        eprintln!("{}: {}", kind, diagnostic.render_plain());
        return;
    };

    let id = frame.file_path.display().to_string();
    let start = char_offset(&frame.code, highlight.start);
    let end = char_offset(&frame.code, highlight.end).max(start);
    let span = (id.clone(), start..end);

    let mut label = Label::new(span.clone()).with_color(color);
    if let Some(message) = &highlight.message {
        label = label.with_message(message);
    }

    let mut report = Report::build(kind, span)
        .with_message(&diagnostic.message)
        .with_label(label);
    for hint in diagnostic.hints.iter().flatten() {
        report = report.with_note(hint);
    }
    if let Some(url) = &diagnostic.documentation_url {
        report = report.with_help(url);
    }

    if report
        .finish()
        .eprint((id, Source::from(frame.code.as_str())))
        .is_err()
    {
        eprintln!("{}: {}", kind, diagnostic.render_plain());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_offset() {
        let code = "ab\ncdé\nf";
        assert_eq!(char_offset(code, Position::new(1, 1)), 0);
        assert_eq!(char_offset(code, Position::new(2, 2)), 4);
        assert_eq!(char_offset(code, Position::new(3, 1)), 7);
    }

    #[test]
    fn test_char_offset_clamps() {
        let code = "ab\ncd";
        // Column past the end of the line stops at the newline
        assert_eq!(char_offset(code, Position::new(1, 40)), 2);
        // Line past the end of the text
        assert_eq!(char_offset(code, Position::new(9, 1)), 5);
    }
}
