/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template source loading.
//!
//! This module provides the [`SourceLoader`] trait and implementations for
//! reading raw template text from various backends (filesystem, memory), plus
//! [`TemplateSource`], a handle bound to one template name that reads its
//! text at most once.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{TemplateError, TemplateResult};

/// Extension appended to template names that don't already carry it.
pub const TEMPLATE_EXTENSION: &str = ".template";

/// The logical namespace a template name is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Top-level views, rendered with a context.
    Template,
    /// Reusable fragments, included with `{{>name}}`.
    Partial,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Template => write!(f, "template"),
            Namespace::Partial => write!(f, "partial"),
        }
    }
}

/// Trait for reading raw template text.
///
/// Implementations are the storage backend only; caching is layered on top by
/// [`TemplateSource`] and the partial registry.
pub trait SourceLoader {
    /// Read the raw text of `name` in `namespace`.
    ///
    /// Returns [`TemplateError::TemplateNotFound`] if the resource is absent
    /// or unreadable.
    fn read(&self, namespace: Namespace, name: &str) -> TemplateResult<String>;
}

impl<T: SourceLoader + ?Sized> SourceLoader for &T {
    fn read(&self, namespace: Namespace, name: &str) -> TemplateResult<String> {
        (**self).read(namespace, name)
    }
}

impl<T: SourceLoader + ?Sized> SourceLoader for Box<T> {
    fn read(&self, namespace: Namespace, name: &str) -> TemplateResult<String> {
        (**self).read(namespace, name)
    }
}

impl<T: SourceLoader + ?Sized> SourceLoader for Arc<T> {
    fn read(&self, namespace: Namespace, name: &str) -> TemplateResult<String> {
        (**self).read(namespace, name)
    }
}

/// Directory names and extension used to map names to files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub templates_dir: String,
    pub partials_dir: String,
    pub extension: String,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            templates_dir: "templates".to_string(),
            partials_dir: "partials".to_string(),
            extension: TEMPLATE_EXTENSION.to_string(),
        }
    }
}

impl SourceLayout {
    fn dir(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Template => &self.templates_dir,
            Namespace::Partial => &self.partials_dir,
        }
    }
}

/// Loader that reads templates from `<root>/<namespace dir>/<name><ext>`.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
    layout: SourceLayout,
}

impl FileSystemLoader {
    /// Create a loader rooted at `root` with the default layout.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_layout(root, SourceLayout::default())
    }

    pub fn with_layout(root: impl Into<PathBuf>, layout: SourceLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a name resolves to.
    pub fn path_for(&self, namespace: Namespace, name: &str) -> PathBuf {
        self.root
            .join(self.layout.dir(namespace))
            .join(with_extension(name, &self.layout.extension))
    }
}

impl SourceLoader for FileSystemLoader {
    fn read(&self, namespace: Namespace, name: &str) -> TemplateResult<String> {
        let path = self.path_for(namespace, name);
        tracing::debug!(%namespace, name, path = %path.display(), "Reading template file");

        let text = std::fs::read_to_string(&path).map_err(|e| {
            TemplateError::not_found(namespace, name, format!("{}: {}", path.display(), e))
        })?;

        // An empty file is treated as a failed read.
        if text.is_empty() {
            return Err(TemplateError::not_found(
                namespace,
                name,
                format!("{} is empty", path.display()),
            ));
        }
        Ok(text)
    }
}

/// Loader backed by an in-memory map.
///
/// Useful for testing and for templates bundled into the application.
/// Names are stored without the extension.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<(Namespace, String), String>,
}

impl MemoryLoader {
    /// Create a new empty memory loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level template.
    pub fn add_template(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.add(Namespace::Template, name, text)
    }

    /// Add a partial.
    pub fn add_partial(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.add(Namespace::Partial, name, text)
    }

    pub fn add(
        &mut self,
        namespace: Namespace,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> &mut Self {
        let name = name.into();
        let name = strip_extension(&name, TEMPLATE_EXTENSION).to_string();
        self.sources.insert((namespace, name), text.into());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn read(&self, namespace: Namespace, name: &str) -> TemplateResult<String> {
        let key = (namespace, strip_extension(name, TEMPLATE_EXTENSION).to_string());
        match self.sources.get(&key) {
            Some(text) if !text.is_empty() => Ok(text.clone()),
            Some(_) => Err(TemplateError::not_found(namespace, name, "source is empty")),
            None => Err(TemplateError::not_found(namespace, name, "no such source")),
        }
    }
}

/// Append `extension` to `name` unless the name already contains it.
///
/// A name that *starts* with the extension (e.g. `".template"`) does not
/// count as carrying it.
pub fn with_extension(name: &str, extension: &str) -> String {
    match name.find(extension) {
        Some(pos) if pos > 0 => name.to_string(),
        _ => format!("{name}{extension}"),
    }
}

fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    match name.strip_suffix(extension) {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// A template bound to one name, caching its raw text after the first load.
///
/// Concurrent first callers share a single load; later calls never touch
/// storage again. A failed load is not cached, so a later call retries.
#[derive(Debug)]
pub struct TemplateSource {
    namespace: Namespace,
    name: String,
    text: OnceCell<Arc<str>>,
}

impl TemplateSource {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
            text: OnceCell::new(),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the text has already been loaded.
    pub fn is_loaded(&self) -> bool {
        self.text.get().is_some()
    }

    /// Load the raw text, reading through `loader` only on the first call.
    pub fn load(&self, loader: &dyn SourceLoader) -> TemplateResult<Arc<str>> {
        self.text
            .get_or_try_init(|| {
                loader
                    .read(self.namespace, &self.name)
                    .map(Arc::from)
            })
            .cloned()
    }
}
