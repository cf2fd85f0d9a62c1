/*
 * directive.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Directive types.
//!
//! A [`Directive`] is one construct found in template text: its span (the exact
//! text to replace), its key or name, and its body spans. Block directives are
//! paired from lexed tags by [`parse_blocks`], which understands nesting.

use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{Tag, TagKind};

/// Byte range into the text being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// A directive found in template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `{{>name}}`
    Partial { name: &'a str, span: Span },

    /// `{{#if:key}}if_body{{#else}}else_body{{#endif}}`
    Conditional {
        key: &'a str,
        if_body: Span,
        else_body: Option<Span>,
        span: Span,
    },

    /// `{{#foreach:key}}body{{#endforeach}}`
    Loop { key: &'a str, body: Span, span: Span },

    /// `{{key}}`
    Value { key: &'a str, span: Span },

    /// `{{#link:url}}`
    Link { url: &'a str, span: Span },
}

impl Directive<'_> {
    /// The span of text this directive replaces.
    pub fn span(&self) -> Span {
        match self {
            Directive::Partial { span, .. }
            | Directive::Conditional { span, .. }
            | Directive::Loop { span, .. }
            | Directive::Value { span, .. }
            | Directive::Link { span, .. } => *span,
        }
    }
}

/// Directives for the self-closing tags in `tags`: partials, values and links.
pub fn inline_directives<'a>(tags: &[Tag<'a>]) -> impl Iterator<Item = Directive<'a>> {
    tags.iter().filter_map(|tag| match tag.kind {
        TagKind::Partial(name) => Some(Directive::Partial {
            name,
            span: tag.span,
        }),
        TagKind::Value(key) => Some(Directive::Value {
            key,
            span: tag.span,
        }),
        TagKind::Link(url) => Some(Directive::Link {
            url,
            span: tag.span,
        }),
        _ => None,
    })
}

/// How unterminated or unmatched block markers are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedPolicy {
    /// Fail the render with [`TemplateError::MalformedDirective`].
    #[default]
    Strict,
    /// Leave offending markers as literal text; cleanup strips them later.
    PassThrough,
}

/// Which block construct to pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Conditional,
    Loop,
}

impl BlockKind {
    fn name(self) -> &'static str {
        match self {
            BlockKind::Conditional => "if",
            BlockKind::Loop => "foreach",
        }
    }

    fn closer(self) -> &'static str {
        match self {
            BlockKind::Conditional => "{{#endif}}",
            BlockKind::Loop => "{{#endforeach}}",
        }
    }
}

/// Role a tag plays for the block kind being parsed.
enum Role<'a> {
    Open(&'a str),
    Else,
    Close,
    Malformed(&'static str),
    Other,
}

fn role<'a>(kind: BlockKind, tag: &TagKind<'a>) -> Role<'a> {
    match (kind, tag) {
        (BlockKind::Conditional, TagKind::If(key)) => Role::Open(*key),
        (BlockKind::Conditional, TagKind::Else) => Role::Else,
        (BlockKind::Conditional, TagKind::EndIf) => Role::Close,
        (BlockKind::Loop, TagKind::Foreach(key)) => Role::Open(*key),
        (BlockKind::Loop, TagKind::EndForeach) => Role::Close,
        (_, TagKind::Malformed { directive, reason }) if *directive == kind.name() => {
            Role::Malformed(*reason)
        }
        _ => Role::Other,
    }
}

struct OpenBlock<'a> {
    tag_index: usize,
    key: &'a str,
    open: Span,
    else_tag: Option<Span>,
}

/// Pair the outermost blocks of `kind` in `text`.
///
/// Nested blocks of the same kind are balanced but not returned; they stay
/// inside the body spans of their enclosing block. Under
/// [`MalformedPolicy::PassThrough`] unmatched markers are skipped and left in
/// the text; under [`MalformedPolicy::Strict`] they are errors.
pub fn parse_blocks<'a>(
    text: &str,
    tags: &[Tag<'a>],
    kind: BlockKind,
    policy: MalformedPolicy,
) -> TemplateResult<Vec<Directive<'a>>> {
    let mut ignored = vec![false; tags.len()];

    loop {
        match pair_blocks(text, tags, kind, policy, &ignored)? {
            Pairing::Done(blocks) => return Ok(blocks),
            Pairing::Unterminated(tag_index) => {
                let tag = &tags[tag_index];
                if policy == MalformedPolicy::Strict {
                    return Err(TemplateError::malformed(
                        text,
                        tag.span.start,
                        format!(
                            "unterminated {{{{#{}:...}}}} block (missing {})",
                            kind.name(),
                            kind.closer()
                        ),
                    ));
                }
                tracing::warn!(
                    directive = kind.name(),
                    offset = tag.span.start,
                    "Leaving unterminated block marker in place"
                );
                ignored[tag_index] = true;
            }
        }
    }
}

enum Pairing<'a> {
    Done(Vec<Directive<'a>>),
    /// Index of the outermost opener left without a closer.
    Unterminated(usize),
}

fn pair_blocks<'a>(
    text: &str,
    tags: &[Tag<'a>],
    kind: BlockKind,
    policy: MalformedPolicy,
    ignored: &[bool],
) -> TemplateResult<Pairing<'a>> {
    let mut stack: Vec<OpenBlock<'a>> = Vec::new();
    let mut blocks = Vec::new();

    for (index, tag) in tags.iter().enumerate() {
        if ignored[index] {
            continue;
        }
        let offset = tag.span.start;
        match role(kind, &tag.kind) {
            Role::Open(key) => stack.push(OpenBlock {
                tag_index: index,
                key,
                open: tag.span,
                else_tag: None,
            }),
            Role::Else => match stack.last_mut() {
                Some(top) if top.else_tag.is_none() => top.else_tag = Some(tag.span),
                Some(_) => unmatched(text, offset, policy, "second {{#else}} in one conditional")?,
                None => unmatched(text, offset, policy, "{{#else}} outside of a conditional")?,
            },
            Role::Close => match stack.pop() {
                Some(open) if stack.is_empty() => blocks.push(close_block(kind, open, tag.span)),
                Some(_) => {}
                None => unmatched(
                    text,
                    offset,
                    policy,
                    format!("{} without a matching opener", kind.closer()),
                )?,
            },
            Role::Malformed(reason) => unmatched(
                text,
                offset,
                policy,
                format!("{{{{#{}:...}}}} with {}", kind.name(), reason),
            )?,
            Role::Other => {}
        }
    }

    Ok(match stack.first() {
        Some(outermost) => Pairing::Unterminated(outermost.tag_index),
        None => Pairing::Done(blocks),
    })
}

/// Report a marker that cannot be paired: an error when strict, a warning otherwise.
pub(crate) fn unmatched(
    text: &str,
    offset: usize,
    policy: MalformedPolicy,
    message: impl Into<String>,
) -> TemplateResult<()> {
    let message = message.into();
    match policy {
        MalformedPolicy::Strict => Err(TemplateError::malformed(text, offset, message)),
        MalformedPolicy::PassThrough => {
            tracing::warn!(offset, "{}", message);
            Ok(())
        }
    }
}

fn close_block<'a>(kind: BlockKind, open: OpenBlock<'a>, close: Span) -> Directive<'a> {
    let span = Span::new(open.open.start, close.end);
    match kind {
        BlockKind::Conditional => match open.else_tag {
            Some(else_tag) => Directive::Conditional {
                key: open.key,
                if_body: Span::new(open.open.end, else_tag.start),
                else_body: Some(Span::new(else_tag.end, close.start)),
                span,
            },
            None => Directive::Conditional {
                key: open.key,
                if_body: Span::new(open.open.end, close.start),
                else_body: None,
                span,
            },
        },
        BlockKind::Loop => Directive::Loop {
            key: open.key,
            body: Span::new(open.open.end, close.start),
            span,
        },
    }
}
