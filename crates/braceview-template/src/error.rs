/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template loading and rendering.

use thiserror::Error;

use crate::source::Namespace;

/// Errors that can occur during template operations.
///
/// Missing context keys are deliberately absent from this list: they resolve
/// softly (blocks vanish, placeholders are stripped) instead of failing.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The backing resource for a template or partial is absent or unreadable.
    #[error("{namespace} {name} not found: {reason}")]
    TemplateNotFound {
        namespace: Namespace,
        name: String,
        reason: String,
    },

    /// A block directive is unterminated, unmatched, or has an empty key.
    #[error("Malformed directive at line {line}, column {column}: {message}")]
    MalformedDirective {
        message: String,
        line: usize,
        column: usize,
    },

    /// A partial includes itself, directly or through other partials.
    #[error("Cyclic partial inclusion: {}", chain.join(" -> "))]
    CyclicPartial { chain: Vec<String> },

    /// Partial nesting went deeper than the configured limit.
    #[error("Partial nesting deeper than {max_depth} levels while resolving: {name}")]
    PartialDepthExceeded { name: String, max_depth: usize },

    /// Context data could not be converted into context values.
    #[error("Invalid context: {message}")]
    InvalidContext { message: String },

    /// Engine configuration could not be parsed or loaded.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O error (e.g., writing rendered output to a sink).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Build a [`TemplateError::MalformedDirective`] located at `offset` in `text`.
    pub(crate) fn malformed(text: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(text, offset);
        TemplateError::MalformedDirective {
            message: message.into(),
            line,
            column,
        }
    }

    pub(crate) fn not_found(
        namespace: Namespace,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TemplateError::TemplateNotFound {
            namespace,
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// 1-based line and column of a byte offset.
fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
