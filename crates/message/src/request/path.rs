//! Route template matching for `{name}` style path parameters.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static PARAM_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// Path parameters extracted from a request path by a route template.
///
/// `/users/{id}/posts/{post}` matched against `/users/7/posts/42/` gives
/// `{"id": "7", "post": "42"}`. Leading and trailing slashes are ignored on both sides, and a
/// path that doesn't match gives no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: HashMap<String, String>,
}

impl PathParams {
    /// Matches `path` against `template`.
    pub fn extract(template: &str, path: &str) -> Self {
        let template = format!("/{}", template.trim_matches('/'));
        let path = format!("/{}", path.trim_matches('/'));

        let names: Vec<&str> = PARAM_REGEX.captures_iter(&template).filter_map(|c| c.get(1)).map(|m| m.as_str()).collect();
        if names.is_empty() {
            return Self::default();
        }

        // literal template text is escaped, every {name} becomes a lazy group
        let mut pattern = String::from("^");
        let mut last = 0;
        for m in PARAM_REGEX.find_iter(&template) {
            pattern.push_str(&regex::escape(&template[last..m.start()]));
            pattern.push_str("(.+?)");
            last = m.end();
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        let Ok(regex) = Regex::new(&pattern) else {
            return Self::default();
        };
        let Some(captures) = regex.captures(&path) else {
            trace!(%template, %path, "path does not match route template");
            return Self::default();
        };

        let params = names
            .into_iter()
            .zip(captures.iter().skip(1))
            .filter_map(|(name, value)| value.map(|value| (name.to_string(), value.as_str().to_string())))
            .collect();
        Self { params }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_params() {
        let params = PathParams::extract("/users/{id}/posts/{post}", "/users/7/posts/42/");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("post"), Some("42"));
    }

    #[test]
    fn trims_slashes() {
        let params = PathParams::extract("users/{id}/", "users/abc");
        assert_eq!(params.get("id"), Some("abc"));
    }

    #[test]
    fn no_match() {
        assert!(PathParams::extract("/users/{id}", "/groups/1").is_empty());
        assert!(PathParams::extract("/users", "/users").is_empty());
        assert!(PathParams::extract("/users/{id}", "/users").is_empty());
    }

    #[test]
    fn literal_text_is_escaped() {
        let params = PathParams::extract("/files/{name}.json", "/files/report.json");
        assert_eq!(params.get("name"), Some("report"));
        assert!(PathParams::extract("/files/{name}.json", "/files/reportxjson").is_empty());
    }
}
