/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag lexer.
//!
//! Scans template text for `{{ ... }}` tags and classifies each one. Text
//! between tags is never returned; passes copy it through by span. Candidate
//! tags that match no directive form (`{{ spaced }}`, `{{@x}}`, `{{}}`) are
//! treated as literal text and skipped.

use crate::directive::Span;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A classified tag found in template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub kind: TagKind<'a>,
    /// Span of the whole tag, braces included.
    pub span: Span,
}

/// The kind of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind<'a> {
    /// `{{>name}}`
    Partial(&'a str),
    /// `{{#if:key}}`
    If(&'a str),
    /// `{{#else}}`
    Else,
    /// `{{#endif}}`
    EndIf,
    /// `{{#foreach:key}}`
    Foreach(&'a str),
    /// `{{#endforeach}}`
    EndForeach,
    /// `{{key}}`
    Value(&'a str),
    /// `{{#link:url}}`
    Link(&'a str),
    /// A recognizable directive with an empty or invalid argument,
    /// e.g. `{{#if:}}` or `{{>two words}}`.
    Malformed {
        directive: &'static str,
        reason: &'static str,
    },
}

/// Scan `text` for directive tags, in order of appearance.
pub fn lex(text: &str) -> Vec<Tag<'_>> {
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find(OPEN) {
        let start = pos + found;
        let inner_start = start + OPEN.len();
        let Some(close) = text[inner_start..].find(CLOSE) else {
            break;
        };
        let inner_end = inner_start + close;
        let end = inner_end + CLOSE.len();

        match classify(&text[inner_start..inner_end]) {
            Some(kind) => {
                tags.push(Tag {
                    kind,
                    span: Span::new(start, end),
                });
                pos = end;
            }
            // Not a directive: the next tag may start inside this one,
            // as in `{{{name}}}`.
            None => pos = start + 1,
        }
    }

    tags
}

/// Classify the text between `{{` and `}}`.
fn classify(inner: &str) -> Option<TagKind<'_>> {
    // `{{#link:?id={{id}}}}` holds a placeholder; only the inner tag counts
    // until a loop or value pass fills it in.
    if inner.contains(OPEN) {
        return None;
    }

    if let Some(name) = inner.strip_prefix('>') {
        return Some(keyed(name, is_partial_char, "partial", TagKind::Partial));
    }

    if let Some(rest) = inner.strip_prefix('#') {
        return match rest {
            "else" => Some(TagKind::Else),
            "endif" => Some(TagKind::EndIf),
            "endforeach" => Some(TagKind::EndForeach),
            _ => {
                if let Some(key) = rest.strip_prefix("if:") {
                    Some(keyed(key, is_key_char, "if", TagKind::If))
                } else if let Some(key) = rest.strip_prefix("foreach:") {
                    Some(keyed(key, is_key_char, "foreach", TagKind::Foreach))
                } else if let Some(url) = rest.strip_prefix("link:") {
                    Some(if url.is_empty() {
                        TagKind::Malformed {
                            directive: "link",
                            reason: "empty URL",
                        }
                    } else {
                        TagKind::Link(url)
                    })
                } else {
                    None
                }
            }
        };
    }

    if !inner.is_empty() && inner.chars().all(is_key_char) {
        return Some(TagKind::Value(inner));
    }

    None
}

fn keyed<'a>(
    arg: &'a str,
    valid: fn(char) -> bool,
    directive: &'static str,
    make: fn(&'a str) -> TagKind<'a>,
) -> TagKind<'a> {
    if arg.is_empty() {
        TagKind::Malformed {
            directive,
            reason: "empty name",
        }
    } else if !arg.chars().all(valid) {
        TagKind::Malformed {
            directive,
            reason: "invalid character in name",
        }
    } else {
        make(arg)
    }
}

/// Characters allowed in condition, loop and value keys.
pub fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Characters allowed in partial names; `/` selects subdirectories.
pub fn is_partial_char(c: char) -> bool {
    is_key_char(c) || c == '/'
}
