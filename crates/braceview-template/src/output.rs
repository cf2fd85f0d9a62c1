/*
 * output.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Partly rendered output.
//!
//! Once the loop pass starts filling in context data, the text is no longer a
//! plain `String`: [`Output`] remembers which bytes came from the template and
//! which were inserted as data. Later passes only act on tags written in the
//! template, so a value such as `"{{secret}}"` or `"{{#link:}}"` is copied
//! through verbatim.

use std::fmt;

use crate::directive::Span;

/// One run of output text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Template text, still open to directive passes.
    Template(String),
    /// Context data or a finished link; never scanned again.
    Data(String),
}

impl Piece {
    pub fn as_str(&self) -> &str {
        match self {
            Piece::Template(s) | Piece::Data(s) => s,
        }
    }

    fn is_data(&self) -> bool {
        matches!(self, Piece::Data(_))
    }

    /// A piece of the same kind holding `text`.
    fn same_kind(&self, text: &str) -> Piece {
        match self {
            Piece::Template(_) => Piece::Template(text.to_string()),
            Piece::Data(_) => Piece::Data(text.to_string()),
        }
    }
}

/// Output text split into template and data pieces.
///
/// Adjacent pieces of the same kind are merged and empty pieces are dropped,
/// so two outputs with the same text and the same data ranges compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pieces: Vec<Piece>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_template(&mut self, text: &str) {
        self.push(Piece::Template(text.to_string()));
    }

    pub fn push_data(&mut self, text: &str) {
        self.push(Piece::Data(text.to_string()));
    }

    pub fn push(&mut self, piece: Piece) {
        if piece.as_str().is_empty() {
            return;
        }
        if let Some(last) = self.pieces.last_mut() {
            match (last, &piece) {
                (Piece::Template(last), Piece::Template(next))
                | (Piece::Data(last), Piece::Data(next)) => {
                    last.push_str(next);
                    return;
                }
                _ => {}
            }
        }
        self.pieces.push(piece);
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.pieces.iter().map(|p| p.as_str().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Pieces paired with their byte ranges in the joined text.
    fn spans(&self) -> impl Iterator<Item = (Span, &Piece)> {
        self.pieces.iter().scan(0, |offset, piece| {
            let start = *offset;
            *offset += piece.as_str().len();
            Some((Span::new(start, *offset), piece))
        })
    }

    /// Whether `span` of the joined text lies entirely outside inserted data.
    pub fn is_template(&self, span: Span) -> bool {
        !self.spans().any(|(range, piece)| {
            piece.is_data() && range.start < span.end && span.start < range.end
        })
    }

    /// Rebuild with each span of the joined text replaced. Spans must be sorted
    /// and disjoint; text between them keeps its template or data marking.
    pub fn splice(&self, replacements: impl IntoIterator<Item = (Span, Piece)>) -> Output {
        let mut out = Output::new();
        let mut pos = 0;
        for (span, replacement) in replacements {
            self.copy_range(Span::new(pos, span.start), &mut out);
            out.push(replacement);
            pos = span.end;
        }
        self.copy_range(Span::new(pos, self.len()), &mut out);
        out
    }

    fn copy_range(&self, wanted: Span, out: &mut Output) {
        for (range, piece) in self.spans() {
            let start = wanted.start.max(range.start);
            let end = wanted.end.min(range.end);
            if start < end {
                out.push(piece.same_kind(&piece.as_str()[start - range.start..end - range.start]));
            }
        }
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        let mut out = Output::new();
        out.push_template(text);
        out
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        let mut out = Output::new();
        out.push(Piece::Template(text));
        out
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for piece in &self.pieces {
            f.write_str(piece.as_str())?;
        }
        Ok(())
    }
}
