/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Brace-directive view template engine.
//!
//! Templates are plain text with embedded `{{ ... }}` directives:
//!
//! - Partials: `{{>layout/header}}`
//! - Conditionals: `{{#if:key}}...{{#else}}...{{#endif}}`
//! - Loops: `{{#foreach:rows}}...{{field}}...{{#endforeach}}`
//! - Values: `{{key}}`
//! - Links: `{{#link:?action=view&id=5}}`
//!
//! # Architecture
//!
//! Rendering is a fixed sequence of whole-text passes (see [`passes`]). Each
//! pass lexes the current text, pairs the directives it owns and rewrites
//! their spans. Partials are expanded first and only have their own nested
//! partials expanded; everything else inside them is resolved by the
//! including template against its context.
//!
//! Template text is read through a [`SourceLoader`]. A [`TemplateSource`]
//! reads its text at most once, and a per-render [`PartialRegistry`] loads
//! each partial at most once per render.
//!
//! # Example
//!
//! ```
//! use braceview_template::{Context, MemoryLoader, Renderer};
//!
//! let mut loader = MemoryLoader::new();
//! loader.add_template("greeting", "{{#if:show}}Hi {{name}}{{#else}}Bye{{#endif}}");
//!
//! let renderer = Renderer::new(loader, false);
//! let ctx = Context::new().with("show", true).with("name", "Sam");
//! assert_eq!(renderer.render("greeting", &ctx).unwrap(), "Hi Sam");
//! ```

pub mod config;
pub mod context;
pub mod directive;
pub mod error;
pub mod lexer;
pub mod link;
pub mod output;
pub mod passes;
pub mod registry;
pub mod renderer;
pub mod source;

// Re-export main types at crate root
pub use config::{CONFIG_FILE_NAME, EngineConfig};
pub use context::{Context, ContextValue, Row, Scalar, row};
pub use directive::{Directive, MalformedPolicy, Span};
pub use error::{TemplateError, TemplateResult};
pub use link::{LinkPolicy, Settings, rewrite_link};
pub use output::{Output, Piece};
pub use registry::{Partial, PartialRegistry};
pub use renderer::{DEFAULT_MAX_PARTIAL_DEPTH, RenderOptions, Renderer, View, check};
pub use source::{
    FileSystemLoader, MemoryLoader, Namespace, SourceLayout, SourceLoader, TEMPLATE_EXTENSION,
    TemplateSource, with_extension,
};
