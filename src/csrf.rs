//! Tokens are read on every mutating request and never cached by the client.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use url::Url;

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("invalid META_TAG regex"));

static TAG_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("invalid TAG_ATTR regex")
});

pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Holds the token a rendered page publishes in `<meta name="csrf-token">`.
pub struct MetaTokenSource {
    name: String,
    content: RwLock<Option<String>>,
}

impl MetaTokenSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            content: RwLock::new(None),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.content.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.content.write() = None;
    }

    /// Replaces the held token with the one found in `html`. A page without
    /// the tag clears the token.
    pub fn refresh_from_html(&self, html: &str) -> Option<String> {
        let found = extract_meta_content(html, &self.name);
        match &found {
            Some(_) => log::debug!("CSRF meta token refreshed from page"),
            None => log::debug!("No {} meta tag on page", self.name),
        }
        *self.content.write() = found.clone();
        found
    }
}

impl TokenSource for MetaTokenSource {
    fn token(&self) -> Option<String> {
        self.content.read().clone().filter(|t| !t.is_empty())
    }
}

/// Reads a named cookie for `url` out of the client's cookie jar.
pub struct CookieTokenSource {
    jar: Arc<Jar>,
    cookie_name: String,
    url: Url,
}

impl CookieTokenSource {
    pub fn new(jar: Arc<Jar>, cookie_name: &str, url: Url) -> Self {
        Self {
            jar,
            cookie_name: cookie_name.to_string(),
            url,
        }
    }
}

impl TokenSource for CookieTokenSource {
    fn token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, &self.cookie_name)
    }
}

/// First source that yields a token wins.
#[derive(Default, Clone)]
pub struct TokenChain {
    sources: Vec<Arc<dyn TokenSource>>,
}

impl TokenChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.sources.push(source);
        self
    }
}

impl TokenSource for TokenChain {
    fn token(&self) -> Option<String> {
        self.sources.iter().find_map(|s| s.token())
    }
}

pub(crate) fn cookie_value(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn extract_meta_content(html: &str, meta_name: &str) -> Option<String> {
    META_TAG.find_iter(html).find_map(|tag| {
        let mut name = None;
        let mut content = None;
        for caps in TAG_ATTR.captures_iter(tag.as_str()) {
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match caps[1].to_ascii_lowercase().as_str() {
                "name" => name = value,
                "content" => content = value,
                _ => {}
            }
        }
        if name == Some(meta_name) {
            content.filter(|c| !c.is_empty()).map(str::to_string)
        } else {
            None
        }
    })
}
