use crate::ast::TextRange;
use crate::level::LintLevel;
use crate::lint::LintDescriptor;

/// A single lint finding produced by vb-lint.
#[derive(Debug, Clone)]
#[must_use]
pub struct Diagnostic {
    pub lint: &'static LintDescriptor,
    pub level: LintLevel,
    pub file: Option<String>,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
    pub suggestion: Option<Suggestion>,
}

/// Optional machine- or human-applicable fix for a diagnostic.
///
/// The replacement covers the diagnostic's whole span.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub message: String,
    pub replacement: String,
    pub applicability: Applicability,
}

/// Applicability of an automated suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    MachineApplicable,
    MaybeIncorrect,
    HasPlaceholders,
    Unspecified,
}

/// Span in a VB source file (1-based row/column positions, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Single position in a VB source file (1-based row, 1-based column in characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Span {
    /// Convert a byte range into a row/column span.
    #[must_use]
    pub fn from_range(range: TextRange, index: &LineIndex) -> Self {
        Self {
            start: index.position(range.start),
            end: index.position(range.end),
        }
    }
}

/// Byte offsets of line starts, for mapping between offsets and positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// 1-based line number containing `offset`.
    pub fn row(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let row = self.row(offset);
        let line_start = self.line_starts[row - 1];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(offset - line_start, |text| text.chars().count())
            + 1;
        Position { row, column }
    }

    /// Byte offset of `pos`, `None` when the row or column lies outside the source.
    pub fn offset(&self, pos: Position) -> Option<usize> {
        let line_start = *self.line_starts.get(pos.row.checked_sub(1)?)?;
        let line_end = self
            .line_starts
            .get(pos.row)
            .map_or(self.source.len(), |next| next - 1);
        let line = &self.source[line_start..line_end];
        let wanted = pos.column.checked_sub(1)?;
        if wanted == line.chars().count() {
            return Some(line_end);
        }
        line.char_indices()
            .nth(wanted)
            .map(|(i, _)| line_start + i)
    }
}
