/*
 * renderer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Top-level rendering.
//!
//! [`Renderer`] owns the source loader and the link policy and runs the passes
//! in order for one template at a time. Every render gets a fresh
//! [`PartialRegistry`], so partial caching never leaks between renders.

use std::io::Write;

use crate::context::Context;
use crate::directive::{BlockKind, MalformedPolicy, parse_blocks};
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{TagKind, lex};
use crate::link::LinkPolicy;
use crate::passes;
use crate::registry::PartialRegistry;
use crate::source::{Namespace, SourceLoader, TemplateSource};

/// Default limit on partial nesting.
pub const DEFAULT_MAX_PARTIAL_DEPTH: usize = 32;

/// Options controlling a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Deepest allowed chain of partials including partials.
    pub max_partial_depth: usize,
    /// What to do with unterminated or unmatched directives.
    pub malformed: MalformedPolicy,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_partial_depth: DEFAULT_MAX_PARTIAL_DEPTH,
            malformed: MalformedPolicy::Strict,
        }
    }
}

/// Renders templates from a loader under a link policy.
#[derive(Debug, Clone)]
pub struct Renderer<L, P> {
    loader: L,
    links: P,
    options: RenderOptions,
}

impl<L: SourceLoader, P: LinkPolicy> Renderer<L, P> {
    pub fn new(loader: L, links: P) -> Self {
        Self {
            loader,
            links,
            options: RenderOptions::default(),
        }
    }

    /// Replace the render options.
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render the named template.
    pub fn render(&self, name: &str, context: &Context) -> TemplateResult<String> {
        self.view(name).render(context)
    }

    /// Render the named template into a sink.
    pub fn render_to<W: Write + ?Sized>(
        &self,
        name: &str,
        context: &Context,
        sink: &mut W,
    ) -> TemplateResult<()> {
        self.view(name).render_to(context, sink)
    }

    /// Render template text that does not come from the loader. Partial
    /// references in the text still resolve through the loader.
    pub fn render_str(&self, text: &str, context: &Context) -> TemplateResult<String> {
        self.run_passes(text, context)
    }

    /// A reusable handle on one template. The source is read on the first
    /// render and reused afterwards.
    pub fn view(&self, name: &str) -> View<'_, L, P> {
        View {
            renderer: self,
            source: TemplateSource::new(Namespace::Template, name),
        }
    }

    fn run_passes(&self, text: &str, context: &Context) -> TemplateResult<String> {
        let policy = self.options.malformed;
        let mut registry = PartialRegistry::new(&self.loader, &self.options);

        let text = passes::expand_partials(text, &mut registry)?;
        log_pass("partials", text.len());
        let text = passes::resolve_conditionals(&text, context, policy)?;
        log_pass("conditionals", text.len());
        let output = passes::expand_loops(&text, context, policy)?;
        log_pass("loops", output.len());
        let output = passes::interpolate_values(&output, context);
        log_pass("values", output.len());
        let output = passes::rewrite_links(&output, &self.links, policy)?;
        log_pass("links", output.len());
        let text = passes::cleanup(&output);
        log_pass("cleanup", text.len());

        Ok(text.trim().to_string())
    }
}

fn log_pass(pass: &str, len: usize) {
    tracing::debug!(pass, len, "Pass complete");
}

/// A template bound to a renderer, holding its own source cache.
pub struct View<'r, L, P> {
    renderer: &'r Renderer<L, P>,
    source: TemplateSource,
}

impl<L: SourceLoader, P: LinkPolicy> View<'_, L, P> {
    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn render(&self, context: &Context) -> TemplateResult<String> {
        let text = self.source.load(&self.renderer.loader)?;
        tracing::debug!(template = self.name(), "Rendering template");
        self.renderer.run_passes(&text, context)
    }

    pub fn render_to<W: Write + ?Sized>(
        &self,
        context: &Context,
        sink: &mut W,
    ) -> TemplateResult<()> {
        let output = self.render(context)?;
        sink.write_all(output.as_bytes())?;
        Ok(())
    }
}

/// Check template text for malformed directives without rendering it.
///
/// Reports the first unterminated or unmatched block marker, or the first tag
/// with an empty or invalid name, under the strict policy. Partials are not
/// followed.
pub fn check(text: &str) -> TemplateResult<()> {
    let tags = lex(text);
    let strict = MalformedPolicy::Strict;

    for tag in &tags {
        match tag.kind {
            TagKind::Malformed { directive, reason }
                if directive == "partial" || directive == "link" =>
            {
                return Err(TemplateError::malformed(
                    text,
                    tag.span.start,
                    format!("{directive} directive with {reason}"),
                ));
            }
            _ => {}
        }
    }

    parse_blocks(text, &tags, BlockKind::Conditional, strict)?;
    parse_blocks(text, &tags, BlockKind::Loop, strict)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::row;
    use crate::link::Settings;
    use crate::source::MemoryLoader;
    use crate::source::tests::CountingLoader;
    use pretty_assertions::assert_eq;

    fn renderer(loader: MemoryLoader) -> Renderer<MemoryLoader, bool> {
        Renderer::new(loader, false)
    }

    #[test]
    fn test_conditional_example() {
        let r = renderer(MemoryLoader::new());
        let text = "{{#if:show}}Hi {{name}}{{#else}}Bye{{#endif}}";

        let shown = Context::new().with("show", true).with("name", "Sam");
        assert_eq!(r.render_str(text, &shown).unwrap(), "Hi Sam");

        let hidden = Context::new().with("show", false);
        assert_eq!(r.render_str(text, &hidden).unwrap(), "Bye");
    }

    #[test]
    fn test_loop_example_trimmed() {
        let r = renderer(MemoryLoader::new());
        let context = Context::new().with(
            "items",
            vec![row([("label", "A")]), row([("label", "B")])],
        );
        assert_eq!(
            r.render_str("{{#foreach:items}}- {{label}}\n{{#endforeach}}", &context)
                .unwrap(),
            "- A\n\n- B"
        );
    }

    #[test]
    fn test_partials_use_including_context() {
        let mut loader = MemoryLoader::new();
        loader
            .add_template("page", "{{>header}}\n<p>{{body}}</p>")
            .add_partial("header", "{{#if:title}}<h1>{{title}}</h1>{{#endif}}");

        let r = renderer(loader);
        let context = Context::new().with("title", "News").with("body", "text");
        assert_eq!(
            r.render("page", &context).unwrap(),
            "<h1>News</h1>\n<p>text</p>"
        );
    }

    #[test]
    fn test_partial_read_once_per_render() {
        let mut loader = CountingLoader::default();
        loader
            .inner
            .add_template("page", "{{>rule}}middle{{>rule}}")
            .add_partial("rule", "--");

        let r = Renderer::new(&loader, false);
        assert_eq!(r.render("page", &Context::new()).unwrap(), "--middle--");
        assert_eq!(loader.reads_of("rule"), 1);

        // A second render starts with a fresh registry.
        r.render("page", &Context::new()).unwrap();
        assert_eq!(loader.reads_of("rule"), 2);
    }

    #[test]
    fn test_view_reads_source_once() {
        let mut loader = CountingLoader::default();
        loader.inner.add_template("home", "{{greeting}}");

        let r = Renderer::new(&loader, false);
        let view = r.view("home");
        assert_eq!(view.name(), "home");
        assert_eq!(
            view.render(&Context::new().with("greeting", "hi")).unwrap(),
            "hi"
        );
        assert_eq!(
            view.render(&Context::new().with("greeting", "hey")).unwrap(),
            "hey"
        );
        assert_eq!(loader.reads_of("home"), 1);
    }

    #[test]
    fn test_links_follow_policy() {
        let text = "<a href=\"{{#link:?action=view&id=5}}\">x</a>";
        let pretty = Renderer::new(
            MemoryLoader::new(),
            Settings {
                pretty_links: true,
                ..Settings::default()
            },
        );
        assert_eq!(
            pretty.render_str(text, &Context::new()).unwrap(),
            "<a href=\"./view/5\">x</a>"
        );
        assert_eq!(
            renderer(MemoryLoader::new())
                .render_str(text, &Context::new())
                .unwrap(),
            "<a href=\"?action=view&id=5\">x</a>"
        );
    }

    #[test]
    fn test_missing_template() {
        let r = renderer(MemoryLoader::new());
        let err = r.render("absent", &Context::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "template absent not found: no such source"
        );
    }

    #[test]
    fn test_strict_and_pass_through() {
        let text = "before {{#if:x}} after";
        let strict = renderer(MemoryLoader::new());
        assert!(matches!(
            strict.render_str(text, &Context::new()),
            Err(TemplateError::MalformedDirective { .. })
        ));

        let lenient = renderer(MemoryLoader::new()).with_options(RenderOptions {
            malformed: MalformedPolicy::PassThrough,
            ..RenderOptions::default()
        });
        assert_eq!(strict.options().malformed, MalformedPolicy::Strict);
        assert_eq!(lenient.options().malformed, MalformedPolicy::PassThrough);
        assert_eq!(
            lenient.render_str(text, &Context::new()).unwrap(),
            "before  after"
        );
    }

    #[test]
    fn test_render_to_sink() {
        let mut loader = MemoryLoader::new();
        loader.add_template("hello", "  Hello {{who}}  \n");
        let r = renderer(loader);

        let mut out = Vec::new();
        r.render_to("hello", &Context::new().with("who", "there"), &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hello there");
    }

    #[test]
    fn test_check() {
        assert!(check("{{#if:a}}{{#foreach:b}}{{x}}{{#endforeach}}{{#endif}}").is_ok());
        assert!(check("{{#foreach:b}}").is_err());
        assert!(check("{{#endif}}").is_err());
        assert!(check("{{>}}").is_err());
        assert!(check("{{#link:}}").is_err());
        assert!(check("{{ not a tag }}").is_ok());
    }
}
