/*
 * passes.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The rewrite passes.
//!
//! Each pass lexes the text it is given, picks out the directives it owns and
//! rebuilds the text with those spans replaced. Passes run in a fixed order;
//! later passes rely on earlier ones having consumed their constructs.
//! From the loop pass on, text travels as an [`Output`] so that inserted
//! context data is never mistaken for directives.
//!
//! 1. [`expand_partials`]
//! 2. [`resolve_conditionals`]
//! 3. [`expand_loops`]
//! 4. [`interpolate_values`]
//! 5. [`rewrite_links`]
//! 6. [`cleanup`]

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::context::{Context, ContextValue, Row};
use crate::directive::{
    BlockKind, Directive, MalformedPolicy, Span, inline_directives, parse_blocks, unmatched,
};
use crate::error::TemplateResult;
use crate::lexer::{Tag, TagKind, lex};
use crate::link::{LinkPolicy, rewrite_link};
use crate::output::{Output, Piece};
use crate::registry::PartialRegistry;

const LINK_OPEN: &str = "{{#link:";
const LINK_CLOSE: &str = "}}";

/// Two or more consecutive line breaks.
static BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n){2,}").expect("valid blank-run pattern"));

/// Rebuild `text` with each span replaced. Spans must be sorted and disjoint.
fn splice<'t>(text: &str, replacements: impl IntoIterator<Item = (Span, Cow<'t, str>)>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for (span, replacement) in replacements {
        out.push_str(&text[pos..span.start]);
        out.push_str(&replacement);
        pos = span.end;
    }
    out.push_str(&text[pos..]);
    out
}

/// Report malformed tags of one directive kind.
fn check_malformed(
    text: &str,
    tags: &[Tag<'_>],
    directive: &str,
    policy: MalformedPolicy,
) -> TemplateResult<()> {
    for tag in tags {
        match tag.kind {
            TagKind::Malformed {
                directive: found,
                reason,
            } if found == directive => unmatched(
                text,
                tag.span.start,
                policy,
                format!("{directive} directive with {reason}"),
            )?,
            _ => {}
        }
    }
    Ok(())
}

/// Pass 1: replace every `{{>name}}` with the named partial's expanded content.
///
/// Only partial references are touched; the result may still contain every
/// other kind of directive.
pub fn expand_partials(text: &str, registry: &mut PartialRegistry<'_>) -> TemplateResult<String> {
    let tags = lex(text);
    check_malformed(text, &tags, "partial", registry.policy())?;

    let mut replacements = Vec::new();
    for directive in inline_directives(&tags) {
        if let Directive::Partial { name, span } = directive {
            let partial = registry.resolve(name)?;
            replacements.push((span, Cow::Owned(partial.content().to_string())));
        }
    }
    Ok(splice(text, replacements))
}

/// Pass 2: resolve `{{#if:key}}...{{#else}}...{{#endif}}` blocks.
///
/// A truthy key selects the if-body, otherwise the else-body (or nothing).
/// Conditionals nested inside the chosen body are resolved the same way.
pub fn resolve_conditionals(
    text: &str,
    context: &Context,
    policy: MalformedPolicy,
) -> TemplateResult<String> {
    let tags = lex(text);
    let blocks = parse_blocks(text, &tags, BlockKind::Conditional, policy)?;

    let mut replacements = Vec::with_capacity(blocks.len());
    for block in blocks {
        if let Directive::Conditional {
            key,
            if_body,
            else_body,
            span,
        } = block
        {
            let truthy = context.get(key).is_some_and(ContextValue::is_truthy);
            let chosen = if truthy { Some(if_body) } else { else_body };
            let replacement = match chosen {
                Some(body) => resolve_conditionals(body.slice(text), context, policy)?,
                None => String::new(),
            };
            replacements.push((span, Cow::Owned(replacement)));
        }
    }
    Ok(splice(text, replacements))
}

/// Pass 3: expand `{{#foreach:key}}...{{#endforeach}}` blocks.
///
/// The body is copied once per row with that row's `{{field}}` placeholders
/// filled in, and the copies are joined with `"\n"`. A key that is missing or
/// bound to a scalar removes the block. Row values are inserted as data.
pub fn expand_loops(
    text: &str,
    context: &Context,
    policy: MalformedPolicy,
) -> TemplateResult<Output> {
    let tags = lex(text);
    let blocks = parse_blocks(text, &tags, BlockKind::Loop, policy)?;

    let mut out = Output::new();
    let mut pos = 0;
    for block in blocks {
        if let Directive::Loop { key, body, span } = block {
            out.push_template(&text[pos..span.start]);
            if let Some(ContextValue::Rows(rows)) = context.get(key) {
                for (index, row) in rows.iter().enumerate() {
                    if index > 0 {
                        out.push_template("\n");
                    }
                    substitute_row(body.slice(text), row, &mut out);
                }
            }
            pos = span.end;
        }
    }
    out.push_template(&text[pos..]);
    Ok(out)
}

/// Append one copy of a loop body filled from a row. Placeholders for fields
/// the row does not have are left for the value pass.
fn substitute_row(body: &str, row: &Row, out: &mut Output) {
    let tags = lex(body);
    let values = inline_directives(&tags).filter_map(|directive| match directive {
        Directive::Value { key, span } => row.get(key).map(|value| (span, value.render())),
        _ => None,
    });

    let mut pos = 0;
    for (span, value) in values {
        out.push_template(&body[pos..span.start]);
        out.push_data(&value);
        pos = span.end;
    }
    out.push_template(&body[pos..]);
}

/// Tags written in the template part of `output`, lexed from its joined
/// `text`. A tag overlapping inserted data is plain text, except that a link
/// may carry data in its URL when both of its markers are template text.
fn template_tags<'t>(output: &Output, text: &'t str) -> Vec<Tag<'t>> {
    lex(text)
        .into_iter()
        .filter(|tag| {
            let Span { start, end } = tag.span;
            match tag.kind {
                TagKind::Link(_)
                | TagKind::Malformed {
                    directive: "link", ..
                } => {
                    output.is_template(Span::new(start, start + LINK_OPEN.len()))
                        && output.is_template(Span::new(end - LINK_CLOSE.len(), end))
                }
                _ => output.is_template(tag.span),
            }
        })
        .collect()
}

/// Pass 4: replace `{{key}}` placeholders bound to scalars.
///
/// Placeholders for missing keys or row lists stay in place. Inserted values
/// are data, so a value containing `{{...}}` is copied verbatim by this and
/// every later pass.
pub fn interpolate_values(text: &Output, context: &Context) -> Output {
    let joined = text.to_string();
    let tags = template_tags(text, &joined);
    let replacements = inline_directives(&tags).filter_map(|directive| match directive {
        Directive::Value { key, span } => context
            .get(key)
            .and_then(ContextValue::as_scalar)
            .map(|scalar| (span, Piece::Data(scalar.render()))),
        _ => None,
    });
    text.splice(replacements)
}

/// Pass 5: replace `{{#link:url}}` with the URL in the policy's form.
pub fn rewrite_links(
    text: &Output,
    links: &dyn LinkPolicy,
    policy: MalformedPolicy,
) -> TemplateResult<Output> {
    let joined = text.to_string();
    let tags = template_tags(text, &joined);
    check_malformed(&joined, &tags, "link", policy)?;

    let pretty = links.pretty_links();
    let replacements = inline_directives(&tags).filter_map(|directive| match directive {
        Directive::Link { url, span } => Some((span, Piece::Data(rewrite_link(url, pretty)))),
        _ => None,
    });
    Ok(text.splice(replacements))
}

/// Pass 6: strip surviving template tags and collapse blank-line runs.
///
/// Every run of two or more line breaks becomes exactly one blank line,
/// written as `\r\n\r\n` when the run contained a carriage return and `\n\n`
/// otherwise.
pub fn cleanup(text: &Output) -> String {
    let joined = text.to_string();
    let stripped = text
        .splice(
            template_tags(text, &joined)
                .into_iter()
                .map(|tag| (tag.span, Piece::Template(String::new()))),
        )
        .to_string();

    BLANK_RUN
        .replace_all(&stripped, |caps: &Captures<'_>| {
            if caps[0].contains('\r') {
                "\r\n\r\n"
            } else {
                "\n\n"
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::row;
    use crate::error::TemplateError;
    use crate::renderer::RenderOptions;
    use crate::source::MemoryLoader;
    use pretty_assertions::assert_eq;

    fn strict_if(text: &str, context: &Context) -> String {
        resolve_conditionals(text, context, MalformedPolicy::Strict).unwrap()
    }

    #[test]
    fn test_conditional_branches() {
        let text = "{{#if:show}}Hi {{name}}{{#else}}Bye{{#endif}}";
        assert_eq!(strict_if(text, &Context::new().with("show", true)), "Hi {{name}}");
        assert_eq!(strict_if(text, &Context::new().with("show", false)), "Bye");
        assert_eq!(strict_if(text, &Context::new()), "Bye");
    }

    #[test]
    fn test_conditional_without_else_vanishes() {
        let text = "a{{#if:missing}}hidden{{#endif}}b";
        assert_eq!(strict_if(text, &Context::new()), "ab");
    }

    #[test]
    fn test_conditional_truthiness() {
        let text = "{{#if:v}}yes{{#else}}no{{#endif}}";
        for (value, expected) in [
            (ContextValue::from("x"), "yes"),
            (ContextValue::from(""), "no"),
            (ContextValue::from("0"), "no"),
            (ContextValue::from(0), "no"),
            (ContextValue::from(7), "yes"),
            (ContextValue::Rows(vec![]), "no"),
            (ContextValue::Rows(vec![row([("a", 1)])]), "yes"),
        ] {
            let context = Context::new().with("v", value.clone());
            assert_eq!(strict_if(text, &context), expected, "value {value:?}");
        }
    }

    #[test]
    fn test_nested_conditionals() {
        let text = "{{#if:a}}A{{#if:b}}B{{#else}}!B{{#endif}}{{#else}}!A{{#endif}}";
        let both = Context::new().with("a", true).with("b", true);
        let only_a = Context::new().with("a", true);
        assert_eq!(strict_if(text, &both), "AB");
        assert_eq!(strict_if(text, &only_a), "A!B");
        assert_eq!(strict_if(text, &Context::new()), "!A");
    }

    #[test]
    fn test_bodies_are_exact() {
        let text = "{{#if:x}}\n  keep spacing \n{{#endif}}";
        assert_eq!(
            strict_if(text, &Context::new().with("x", 1)),
            "\n  keep spacing \n"
        );
    }

    #[test]
    fn test_loop_rows_joined_by_newline() {
        let text = "{{#foreach:items}}- {{label}}\n{{#endforeach}}";
        let context = Context::new().with(
            "items",
            vec![row([("label", "A")]), row([("label", "B")])],
        );
        assert_eq!(
            expand_loops(text, &context, MalformedPolicy::Strict)
                .unwrap()
                .to_string(),
            "- A\n\n- B\n"
        );
    }

    #[test]
    fn test_loop_missing_or_scalar_key_removes_block() {
        let text = "[{{#foreach:items}}x{{#endforeach}}]";
        let scalar = Context::new().with("items", "not rows");
        assert_eq!(
            expand_loops(text, &Context::new(), MalformedPolicy::Strict)
                .unwrap()
                .to_string(),
            "[]"
        );
        assert_eq!(
            expand_loops(text, &scalar, MalformedPolicy::Strict)
                .unwrap()
                .to_string(),
            "[]"
        );
    }

    #[test]
    fn test_loop_leaves_unknown_fields_for_value_pass() {
        let text = "{{#foreach:posts}}{{title}} by {{author}};{{#endforeach}}";
        let context = Context::new()
            .with("author", "Sam")
            .with("posts", vec![row([("title", "One")]), row([("title", "Two")])]);

        let looped = expand_loops(text, &context, MalformedPolicy::Strict).unwrap();
        assert_eq!(looped.to_string(), "One by {{author}};\nTwo by {{author}};");
        assert_eq!(
            interpolate_values(&looped, &context).to_string(),
            "One by Sam;\nTwo by Sam;"
        );
    }

    #[test]
    fn test_nested_loop_copied_literally() {
        let text = "{{#foreach:outer}}<{{#foreach:inner}}i{{#endforeach}}>{{#endforeach}}";
        let context = Context::new().with("outer", vec![row([("n", 1)])]);
        let looped = expand_loops(text, &context, MalformedPolicy::Strict).unwrap();
        assert_eq!(looped.to_string(), "<{{#foreach:inner}}i{{#endforeach}}>");
        assert_eq!(cleanup(&looped), "<i>");
    }

    #[test]
    fn test_interpolation() {
        let context = Context::new()
            .with("name", "Sam")
            .with("count", 3)
            .with("flag", true)
            .with("rows", vec![row([("a", "b")])]);
        assert_eq!(
            interpolate_values(&"{{name}}:{{count}}:{{flag}}:{{rows}}:{{missing}}".into(), &context)
                .to_string(),
            "Sam:3:1:{{rows}}:{{missing}}"
        );
    }

    #[test]
    fn test_interpolated_values_not_rescanned() {
        let context = Context::new()
            .with("a", "{{b}}")
            .with("b", "nope");
        let once = interpolate_values(&"{{a}}".into(), &context);
        assert_eq!(once.pieces(), &[Piece::Data("{{b}}".to_string())]);
        assert_eq!(interpolate_values(&once, &context).to_string(), "{{b}}");
        assert_eq!(cleanup(&once), "{{b}}");
    }

    #[test]
    fn test_row_values_are_data() {
        let text = "{{#foreach:posts}}[{{title}}]{{#endforeach}}";
        let context = Context::new()
            .with("secret", "S3CRET")
            .with("posts", vec![row([("title", "{{secret}}")])]);

        let looped = expand_loops(text, &context, MalformedPolicy::Strict).unwrap();
        let valued = interpolate_values(&looped, &context);
        assert_eq!(valued.to_string(), "[{{secret}}]");
        assert_eq!(cleanup(&valued), "[{{secret}}]");
    }

    #[test]
    fn test_link_url_may_hold_row_value() {
        let text = "{{#foreach:posts}}{{#link:?controller=post&id={{id}}}}{{#endforeach}}";
        let context = Context::new().with("posts", vec![row([("id", 7)])]);

        let looped = expand_loops(text, &context, MalformedPolicy::Strict).unwrap();
        let linked = rewrite_links(&looped, &true, MalformedPolicy::Strict).unwrap();
        assert_eq!(linked.to_string(), "./post/7");
    }

    #[test]
    fn test_links_inside_data_are_left_alone() {
        let context = Context::new()
            .with("body", "see {{#link:?p=1}} and {{#link:}}")
            .with("frag", "#link:?p=2");
        let valued = interpolate_values(&"{{body}}|{{{{frag}}}}".into(), &context);

        let linked = rewrite_links(&valued, &true, MalformedPolicy::Strict).unwrap();
        assert_eq!(
            cleanup(&linked),
            "see {{#link:?p=1}} and {{#link:}}|{{#link:?p=2}}"
        );
    }

    #[test]
    fn test_links() {
        let text = "<a href=\"{{#link:?action=view&id=5}}\">";
        assert_eq!(
            rewrite_links(&text.into(), &false, MalformedPolicy::Strict)
                .unwrap()
                .to_string(),
            "<a href=\"?action=view&id=5\">"
        );
        assert_eq!(
            rewrite_links(&text.into(), &true, MalformedPolicy::Strict)
                .unwrap()
                .to_string(),
            "<a href=\"./view/5\">"
        );
    }

    #[test]
    fn test_malformed_link() {
        let err = rewrite_links(&"{{#link:}}".into(), &true, MalformedPolicy::Strict).unwrap_err();
        assert!(matches!(err, TemplateError::MalformedDirective { .. }));
        assert_eq!(
            rewrite_links(&"{{#link:}}".into(), &true, MalformedPolicy::PassThrough)
                .unwrap()
                .to_string(),
            "{{#link:}}"
        );
    }

    #[test]
    fn test_cleanup_strips_surviving_tags() {
        assert_eq!(
            cleanup(&"a{{missing}}b{{#else}}c{{#endif}}{{ literal }}".into()),
            "abc{{ literal }}"
        );
    }

    #[test]
    fn test_cleanup_collapses_blank_runs() {
        assert_eq!(cleanup(&"a\n\n\n\nb\nc".into()), "a\n\nb\nc");
        assert_eq!(cleanup(&"a\r\n\r\n\r\nb".into()), "a\r\n\r\nb");
        assert_eq!(cleanup(&"a\n\r\n\nb".into()), "a\r\n\r\nb");
    }

    #[test]
    fn test_expand_partials_pass() {
        let mut loader = MemoryLoader::new();
        loader.add_partial("nav", "<nav>{{#link:?page=home}}</nav>");
        let options = RenderOptions::default();
        let mut registry = PartialRegistry::new(&loader, &options);

        assert_eq!(
            expand_partials("{{>nav}}{{>nav}}", &mut registry).unwrap(),
            "<nav>{{#link:?page=home}}</nav><nav>{{#link:?page=home}}</nav>"
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_partial_name() {
        let loader = MemoryLoader::new();
        let strict = RenderOptions::default();
        let mut registry = PartialRegistry::new(&loader, &strict);
        assert!(matches!(
            expand_partials("x{{>}}", &mut registry),
            Err(TemplateError::MalformedDirective { .. })
        ));

        let lenient = RenderOptions {
            malformed: MalformedPolicy::PassThrough,
            ..RenderOptions::default()
        };
        let mut registry = PartialRegistry::new(&loader, &lenient);
        assert_eq!(expand_partials("x{{>}}", &mut registry).unwrap(), "x{{>}}");
    }
}
