//! Auto-fix infrastructure for applying code transformations.
//!
//! All functions work on strings and byte offsets; no file I/O.
//!
//! - Edits are validated to be non-overlapping before application
//! - Edits are applied in reverse order to preserve byte offsets

use crate::diagnostics::{Applicability, Diagnostic, LineIndex};
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

/// Error type for fix application operations.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("Overlapping edits detected at byte {0}")]
    OverlappingEdits(usize),

    #[error("Edit range [{start}..{end}) exceeds source length {source_len}")]
    InvalidRange {
        start: usize,
        end: usize,
        source_len: usize,
    },

    #[error("Edit start {start} is after edit end {end}")]
    InvalidEditOrder { start: usize, end: usize },

    #[error("Edit range [{start}..{end}) splits a character")]
    NotCharBoundary { start: usize, end: usize },
}

/// A replacement of the byte range `[start_byte..end_byte)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start_byte: usize,
    pub end_byte: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(start_byte: usize, end_byte: usize, replacement: String) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement,
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_byte..self.end_byte
    }

    /// `[a, b)` and `[c, d)` overlap when `a < d && c < b`.
    pub fn overlaps_with(&self, other: &TextEdit) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }

    pub fn validate(&self, source: &str) -> Result<(), FixError> {
        if self.start_byte > self.end_byte {
            return Err(FixError::InvalidEditOrder {
                start: self.start_byte,
                end: self.end_byte,
            });
        }

        if self.end_byte > source.len() {
            return Err(FixError::InvalidRange {
                start: self.start_byte,
                end: self.end_byte,
                source_len: source.len(),
            });
        }

        if !source.is_char_boundary(self.start_byte) || !source.is_char_boundary(self.end_byte) {
            return Err(FixError::NotCharBoundary {
                start: self.start_byte,
                end: self.end_byte,
            });
        }

        Ok(())
    }
}

/// Validate that a list of edits are non-overlapping and within bounds.
pub fn validate_edits(edits: &[TextEdit], source: &str) -> Result<(), FixError> {
    for edit in edits {
        edit.validate(source)?;
    }

    for (i, edit) in edits.iter().enumerate() {
        if let Some(other) = edits[i + 1..].iter().find(|o| edit.overlaps_with(o)) {
            return Err(FixError::OverlappingEdits(edit.start_byte.max(other.start_byte)));
        }
    }

    Ok(())
}

/// Apply a list of non-overlapping edits to source code.
///
/// # Errors
///
/// Returns an error if edits overlap, are out of order, exceed the source
/// length, or split a multi-byte character.
///
/// # Example
///
/// ```rust
/// use vb_lint::fix::{TextEdit, apply_fixes};
///
/// let source = "Touch(point.X)";
/// let edits = vec![TextEdit::new(6, 13, "(point.X)".to_string())];
///
/// let result = apply_fixes(source, &edits).unwrap();
/// assert_eq!(result, "Touch((point.X))");
/// ```
pub fn apply_fixes(source: &str, edits: &[TextEdit]) -> Result<String, FixError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    validate_edits(edits, source)?;

    let mut sorted_edits = edits.to_vec();
    sorted_edits.sort_by(|a, b| b.start_byte.cmp(&a.start_byte));

    let mut result = source.to_string();
    for edit in sorted_edits {
        result.replace_range(edit.range(), &edit.replacement);
    }

    Ok(result)
}

/// Outcome of applying diagnostic suggestions to one source text.
#[derive(Debug)]
pub struct FixResult {
    pub fixed_source: String,
    pub fixes_applied: usize,
    /// Suggestions left out: not applicable at the requested safety, unmappable, or overlapping.
    pub fixes_skipped: usize,
}

/// Apply the suggestions carried by `diagnostics`.
///
/// `MachineApplicable` suggestions are always applied. `MaybeIncorrect` and
/// `HasPlaceholders` ones only with `allow_unsafe`. A suggestion whose span
/// overlaps an earlier one is skipped so a later pass can pick it up.
pub fn apply_suggestions(
    source: &str,
    diagnostics: &[Diagnostic],
    allow_unsafe: bool,
) -> Result<FixResult, FixError> {
    let index = LineIndex::new(source);
    let mut edits: Vec<TextEdit> = Vec::new();
    let mut skipped = 0usize;

    for diag in diagnostics {
        let Some(suggestion) = &diag.suggestion else {
            continue;
        };

        let applicable = match suggestion.applicability {
            Applicability::MachineApplicable => true,
            Applicability::MaybeIncorrect | Applicability::HasPlaceholders => allow_unsafe,
            Applicability::Unspecified => false,
        };
        if !applicable {
            skipped += 1;
            continue;
        }

        let (Some(start), Some(end)) = (index.offset(diag.span.start), index.offset(diag.span.end))
        else {
            skipped += 1;
            continue;
        };
        edits.push(TextEdit::new(start, end, suggestion.replacement.clone()));
    }

    edits.sort_by_key(|e| (e.start_byte, e.end_byte));
    let mut kept: Vec<TextEdit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if kept.last().is_some_and(|prev| prev.overlaps_with(&edit)) {
            skipped += 1;
        } else {
            kept.push(edit);
        }
    }

    Ok(FixResult {
        fixed_source: apply_fixes(source, &kept)?,
        fixes_applied: kept.len(),
        fixes_skipped: skipped,
    })
}

/// Unified diff between original and fixed source with 3 lines of context.
pub fn format_diff(original: &str, fixed: &str, path: &Path) -> String {
    format_diff_with_context(original, fixed, path, 3)
}

/// Line-by-line unified diff with configurable context lines.
///
/// Fixes never add or remove lines, so lines are compared pairwise.
pub fn format_diff_with_context(
    original: &str,
    fixed: &str,
    path: &Path,
    context: usize,
) -> String {
    let orig_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();
    let max_len = orig_lines.len().max(fixed_lines.len());

    let changed: Vec<usize> = (0..max_len)
        .filter(|&i| orig_lines.get(i) != fixed_lines.get(i))
        .collect();
    if changed.is_empty() {
        return String::new();
    }

    // Group changed lines into hunks whose context windows touch.
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &i in &changed {
        let start = i.saturating_sub(context);
        let end = (i + context + 1).min(max_len);
        match hunks.last_mut() {
            Some((_, hunk_end)) if start <= *hunk_end => *hunk_end = end,
            _ => hunks.push((start, end)),
        }
    }

    let path_str = path.display();
    let mut output = String::new();
    let _ = writeln!(output, "--- a/{path_str}");
    let _ = writeln!(output, "+++ b/{path_str}");

    for (start, end) in hunks {
        let orig_size = end.min(orig_lines.len()).saturating_sub(start);
        let fixed_size = end.min(fixed_lines.len()).saturating_sub(start);
        let _ = writeln!(
            output,
            "@@ -{},{} +{},{} @@",
            start + 1,
            orig_size,
            start + 1,
            fixed_size
        );

        for line_idx in start..end {
            let orig = orig_lines.get(line_idx);
            let fix = fixed_lines.get(line_idx);
            if orig == fix {
                if let Some(line) = orig {
                    let _ = writeln!(output, " {line}");
                }
                continue;
            }
            if let Some(line) = orig {
                let _ = writeln!(output, "-{line}");
            }
            if let Some(line) = fix {
                let _ = writeln!(output, "+{line}");
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Position, Span, Suggestion};
    use crate::level::LintLevel;
    use crate::lint::{LintCategory, LintDescriptor};

    #[test]
    fn test_overlaps_with() {
        let edit1 = TextEdit::new(0, 10, "a".to_string());
        let edit2 = TextEdit::new(5, 15, "b".to_string());
        let edit3 = TextEdit::new(10, 20, "c".to_string());

        assert!(edit1.overlaps_with(&edit2));
        assert!(edit2.overlaps_with(&edit1));
        assert!(!edit1.overlaps_with(&edit3));
        assert!(!edit3.overlaps_with(&edit1));
    }

    #[test]
    fn test_validate_edit_errors() {
        let source = "Dim x As Integer";
        assert!(matches!(
            TextEdit::new(10, 5, String::new()).validate(source),
            Err(FixError::InvalidEditOrder { .. })
        ));
        assert!(matches!(
            TextEdit::new(0, 99, String::new()).validate(source),
            Err(FixError::InvalidRange { .. })
        ));
        assert!(matches!(
            TextEdit::new(1, 2, String::new()).validate("\u{e9}x"),
            Err(FixError::NotCharBoundary { .. })
        ));
        assert!(TextEdit::new(0, 3, String::new()).validate(source).is_ok());
    }

    #[test]
    fn test_validate_edits_overlapping() {
        let edits = vec![
            TextEdit::new(0, 10, "a".to_string()),
            TextEdit::new(5, 15, "b".to_string()),
        ];
        assert!(matches!(
            validate_edits(&edits, &"x".repeat(20)),
            Err(FixError::OverlappingEdits(5))
        ));
    }

    #[test]
    fn test_apply_empty_ranges_and_empty_replacements() {
        let source = "Call Touch(p.X)";
        let removal = [TextEdit::new(0, 5, String::new())];
        assert_eq!(apply_fixes(source, &removal).unwrap(), "Touch(p.X)");
        let wrap = [
            TextEdit::new(11, 11, "(".to_string()),
            TextEdit::new(14, 14, ")".to_string()),
        ];
        assert_eq!(apply_fixes(source, &wrap).unwrap(), "Call Touch((p.X))");
    }

    #[test]
    fn test_apply_edits_in_any_order() {
        let source = "abc def ghi";
        let edits = vec![
            TextEdit::new(8, 11, "3".to_string()),
            TextEdit::new(0, 3, "1".to_string()),
            TextEdit::new(4, 7, "2".to_string()),
        ];
        assert_eq!(apply_fixes(source, &edits).unwrap(), "1 2 3");
        assert_eq!(apply_fixes(source, &[]).unwrap(), source);
    }

    static TEST_LINT: LintDescriptor =
        LintDescriptor::new("test", LintCategory::Suspicious, "test");

    fn diag(
        source: &str,
        needle: &str,
        replacement: &str,
        applicability: Applicability,
    ) -> Diagnostic {
        let index = LineIndex::new(source);
        let start = source.find(needle).unwrap();
        Diagnostic {
            lint: &TEST_LINT,
            level: LintLevel::Warn,
            file: None,
            span: Span {
                start: index.position(start),
                end: index.position(start + needle.len()),
            },
            message: "test".into(),
            help: None,
            suggestion: Some(Suggestion {
                message: "Replace".into(),
                replacement: replacement.into(),
                applicability,
            }),
        }
    }

    #[test]
    fn suggestions_respect_applicability() {
        let source = "Touch(p.X)\nTouch(q.Y)\n";
        let diags = vec![
            diag(source, "p.X", "(p.X)", Applicability::MaybeIncorrect),
            diag(source, "q.Y", "(q.Y)", Applicability::MachineApplicable),
        ];

        let safe = apply_suggestions(source, &diags, false).unwrap();
        assert_eq!(safe.fixed_source, "Touch(p.X)\nTouch((q.Y))\n");
        assert_eq!((safe.fixes_applied, safe.fixes_skipped), (1, 1));

        let all = apply_suggestions(source, &diags, true).unwrap();
        assert_eq!(all.fixed_source, "Touch((p.X))\nTouch((q.Y))\n");
        assert_eq!((all.fixes_applied, all.fixes_skipped), (2, 0));
    }

    #[test]
    fn overlapping_suggestions_are_deferred() {
        let source = "Touch(a.b.c)";
        let diags = vec![
            diag(source, "a.b.c", "(a.b.c)", Applicability::MachineApplicable),
            diag(source, "a.b", "(a.b)", Applicability::MachineApplicable),
        ];
        let result = apply_suggestions(source, &diags, false).unwrap();
        assert_eq!(result.fixes_applied, 1);
        assert_eq!(result.fixes_skipped, 1);
        assert_eq!(result.fixed_source, "Touch((a.b).c)");
    }

    #[test]
    fn unmappable_spans_are_skipped() {
        let source = "Touch(p.X)";
        let mut d = diag(source, "p.X", "(p.X)", Applicability::MachineApplicable);
        d.span.start = Position { row: 9, column: 1 };
        let result = apply_suggestions(source, &[d], false).unwrap();
        assert_eq!(result.fixes_applied, 0);
        assert_eq!(result.fixed_source, source);
    }

    #[test]
    fn test_format_diff() {
        let original = "Sub A()\n    Touch(p.X)\nEnd Sub";
        let fixed = "Sub A()\n    Touch((p.X))\nEnd Sub";
        let diff = format_diff(original, fixed, Path::new("test.vb"));
        assert!(diff.contains("--- a/test.vb"));
        assert!(diff.contains("+++ b/test.vb"));
        assert!(diff.contains("@@ -1,3 +1,3 @@"));
        assert!(diff.contains("-    Touch(p.X)"));
        assert!(diff.contains("+    Touch((p.X))"));
        assert!(diff.contains(" Sub A()"));
        assert!(format_diff(original, original, Path::new("test.vb")).is_empty());
    }
}
