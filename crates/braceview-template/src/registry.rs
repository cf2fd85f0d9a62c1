/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Per-render partial registry.
//!
//! A registry lives for exactly one top-level render. Each partial name is
//! loaded and expanded at most once; later references reuse the cached
//! [`Partial`]. The registry also tracks the chain of partials currently being
//! expanded so that cycles and runaway nesting fail instead of recursing
//! forever.

use std::collections::HashMap;
use std::sync::Arc;

use crate::directive::MalformedPolicy;
use crate::error::{TemplateError, TemplateResult};
use crate::passes;
use crate::renderer::RenderOptions;
use crate::source::{Namespace, SourceLoader, TemplateSource};

/// A partial whose nested partial references have been expanded.
///
/// No other pass has run on the content; conditionals, loops, values and links
/// are resolved later against the including template's context.
#[derive(Debug)]
pub struct Partial {
    name: String,
    content: String,
}

impl Partial {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Cache of resolved partials for one render.
pub struct PartialRegistry<'a> {
    loader: &'a dyn SourceLoader,
    partials: HashMap<String, Arc<Partial>>,
    /// Names of partials currently being expanded, outermost first.
    chain: Vec<String>,
    max_depth: usize,
    policy: MalformedPolicy,
}

impl<'a> PartialRegistry<'a> {
    pub fn new(loader: &'a dyn SourceLoader, options: &RenderOptions) -> Self {
        Self {
            loader,
            partials: HashMap::new(),
            chain: Vec::new(),
            max_depth: options.max_partial_depth,
            policy: options.malformed,
        }
    }

    pub(crate) fn policy(&self) -> MalformedPolicy {
        self.policy
    }

    /// Resolve a partial by name, loading and expanding it on first use.
    pub fn resolve(&mut self, name: &str) -> TemplateResult<Arc<Partial>> {
        if let Some(partial) = self.partials.get(name) {
            tracing::trace!(partial = name, "Partial cache hit");
            return Ok(Arc::clone(partial));
        }

        if self.chain.iter().any(|open| open == name) {
            let mut chain = self.chain.clone();
            chain.push(name.to_string());
            return Err(TemplateError::CyclicPartial { chain });
        }

        if self.chain.len() >= self.max_depth {
            return Err(TemplateError::PartialDepthExceeded {
                name: name.to_string(),
                max_depth: self.max_depth,
            });
        }

        let source = TemplateSource::new(Namespace::Partial, name);
        let raw = source.load(self.loader)?;
        tracing::debug!(partial = name, depth = self.chain.len(), "Expanding partial");

        self.chain.push(name.to_string());
        let expanded = passes::expand_partials(&raw, self);
        self.chain.pop();

        let partial = Arc::new(Partial {
            name: name.to_string(),
            content: expanded?,
        });
        self.partials
            .insert(name.to_string(), Arc::clone(&partial));
        Ok(partial)
    }

    /// Number of distinct partials resolved so far.
    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    /// Whether `name` has already been resolved in this render.
    pub fn contains(&self, name: &str) -> bool {
        self.partials.contains_key(name)
    }
}
