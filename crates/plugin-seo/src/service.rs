//! Slug generation service, exposed to other plugins as `seo.slugs`.

use std::sync::LazyLock;

use regex::Regex;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Turns titles into URL slugs.
#[derive(Debug, Clone)]
pub struct SlugService {
    max_len: usize,
}

impl SlugService {
    /// Creates a service that truncates slugs to `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Lowercases, collapses non-alphanumeric runs into `-`, and trims.
    pub fn slugify(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        let slug = NON_ALNUM.replace_all(&lower, "-");
        let mut slug = slug.trim_matches('-').to_string();
        if slug.len() > self.max_len {
            slug.truncate(self.max_len);
            slug = slug.trim_end_matches('-').to_string();
        }
        slug
    }
}

impl Default for SlugService {
    fn default() -> Self {
        Self::new(80)
    }
}
