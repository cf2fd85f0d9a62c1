/*
 * link.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Link policy and link rewriting.
//!
//! The link pass asks a [`LinkPolicy`] whether pretty links are enabled. With
//! pretty links off, `{{#link:?action=view&id=5}}` renders the URL verbatim;
//! with them on, the query values become path segments: `./view/5`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::{Context, Scalar};

/// Decides the URL form produced by `{{#link:...}}` directives.
pub trait LinkPolicy {
    /// Whether links should be rewritten as path segments.
    fn pretty_links(&self) -> bool;
}

impl LinkPolicy for bool {
    fn pretty_links(&self) -> bool {
        *self
    }
}

impl<T: LinkPolicy + ?Sized> LinkPolicy for &T {
    fn pretty_links(&self) -> bool {
        (**self).pretty_links()
    }
}

impl<T: LinkPolicy + ?Sized> LinkPolicy for Arc<T> {
    fn pretty_links(&self) -> bool {
        (**self).pretty_links()
    }
}

/// Site-wide settings.
///
/// Besides acting as a [`LinkPolicy`], settings can be exposed to templates
/// through [`Settings::to_context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    pub description: String,
    pub colophon: String,
    pub pretty_links: bool,
    pub posts_per_page: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            colophon: String::new(),
            pretty_links: false,
            posts_per_page: 1,
        }
    }
}

impl Settings {
    /// Look up a setting by its column name.
    pub fn get(&self, key: &str) -> Option<Scalar> {
        match key {
            "title" => Some(self.title.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "colophon" => Some(self.colophon.as_str().into()),
            "pretty_links" => Some(self.pretty_links.into()),
            "posts_per_page" => Some(u64::from(self.posts_per_page).into()),
            _ => None,
        }
    }

    /// All settings as context bindings.
    pub fn to_context(&self) -> Context {
        ["title", "description", "colophon", "pretty_links", "posts_per_page"]
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }
}

impl LinkPolicy for Settings {
    fn pretty_links(&self) -> bool {
        self.pretty_links
    }
}

/// Rewrite a link URL under the given pretty-link setting.
///
/// With `pretty` on, the query string after the first `?` is decoded into
/// key/value pairs and the values are joined into `./v1/v2/...`. A key given
/// twice keeps its first position and its last value. A URL with no query
/// string becomes `./`.
pub fn rewrite_link(url: &str, pretty: bool) -> String {
    if !pretty {
        return url.to_string();
    }

    let query = url.split_once('?').map_or("", |(_, query)| query);
    let mut params: IndexMap<String, String> = IndexMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        params.insert(key.into_owned(), value.into_owned());
    }

    let values: Vec<&str> = params.values().map(String::as_str).collect();
    format!("./{}", values.join("/"))
}
