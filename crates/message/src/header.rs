//! Case-insensitive, order-preserving header collection shared by requests and responses.
//!
//! [`Headers`] keeps the original case of the first spelling it saw (or of the latest
//! [`Headers::with_header`] call) and a lowercase index for lookups. All mutators clone and
//! return, so a `Headers` value embedded in a message is never changed behind its back.
//!
//! # Validation
//!
//! - Names must match `^[a-zA-Z0-9'`#$%&*+.^_|~!-]+$`
//! - Values are trimmed of leading/trailing spaces and tabs and must not contain `\r`, `\n` or NUL
//! - An empty value list is rejected

use std::collections::HashMap;

use crate::{MessageError, ensure};

/// An ordered header map with case-insensitive names.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
    /// lowercase name -> index in `entries`
    index: HashMap<String, usize>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a header collection from `(name, value)` pairs, merging repeated names (compared
    /// case-insensitively) into one entry in their first-seen position.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] for the first invalid name or value.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.append(name.as_ref(), vec![normalize_value(value.as_ref())?])?;
        }
        Ok(headers)
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns the values of a header in insertion order, empty if absent.
    pub fn get(&self, name: &str) -> &[String] {
        self.position(name).map_or(&[], |i| self.entries[i].1.as_slice())
    }

    /// Returns the values of a header joined by `", "`, empty if absent.
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates `(original name, values)` in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Returns a copy with all values of `name` replaced by `value`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] if the name or the value is invalid.
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, MessageError> {
        self.with_header_values(name, [value])
    }

    /// Returns a copy with all values of `name` replaced by `values`. The name takes the
    /// spelling given here.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] if the name or any value is invalid, or if
    /// `values` is empty.
    pub fn with_header_values<I, V>(&self, name: &str, values: I) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let values = normalize_values(values)?;
        validate_name(name)?;

        let mut new = self.clone();
        match new.position(name) {
            Some(i) => new.entries[i] = (name.to_string(), values),
            None => new.push(name, values),
        }
        Ok(new)
    }

    /// Returns a copy with `value` appended to the values of `name`, creating the entry if absent.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidArgument`] if the name or the value is invalid.
    pub fn with_added_header(&self, name: &str, value: &str) -> Result<Self, MessageError> {
        self.with_added_header_values(name, [value])
    }

    pub fn with_added_header_values<I, V>(&self, name: &str, values: I) -> Result<Self, MessageError>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let values = normalize_values(values)?;
        let mut new = self.clone();
        new.append(name, values)?;
        Ok(new)
    }

    /// Returns a copy without `name`. Removing an absent header returns an equal copy.
    pub fn without_header(&self, name: &str) -> Self {
        let Some(position) = self.position(name) else {
            return self.clone();
        };

        let mut new = self.clone();
        new.entries.remove(position);
        new.reindex();
        new
    }

    /// Replaces `name` with `value` and moves it to the first position, used for `Host`.
    pub(crate) fn set_first(&mut self, name: &str, value: &str) -> Result<(), MessageError> {
        validate_name(name)?;
        let value = normalize_value(value)?;

        if let Some(position) = self.position(name) {
            self.entries.remove(position);
        }
        self.entries.insert(0, (name.to_string(), vec![value]));
        self.reindex();
        Ok(())
    }

    /// Appends values in place, keeping the first-seen spelling of the name.
    pub(crate) fn append(&mut self, name: &str, values: Vec<String>) -> Result<(), MessageError> {
        validate_name(name)?;
        ensure!(!values.is_empty(), MessageError::invalid_argument(format!("header {name} must have at least one value")));

        match self.position(name) {
            Some(i) => self.entries[i].1.extend(values),
            None => self.push(name, values),
        }
        Ok(())
    }

    fn push(&mut self, name: &str, values: Vec<String>) {
        self.index.insert(name.to_ascii_lowercase(), self.entries.len());
        self.entries.push((name.to_string(), values));
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    fn reindex(&mut self) {
        self.index = self.entries.iter().enumerate().map(|(i, (name, _))| (name.to_ascii_lowercase(), i)).collect();
    }
}

impl PartialEq for Headers {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Headers {}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[inline]
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"'`#$%&*+.^_|~!-".contains(&b)
}

/// Checks a header name against the RFC 7230 token grammar.
pub(crate) fn validate_name(name: &str) -> Result<(), MessageError> {
    ensure!(
        !name.is_empty() && name.bytes().all(is_token_byte),
        MessageError::invalid_argument(format!("header name must be an RFC 7230 compatible string: {name:?}"))
    );
    Ok(())
}

/// Trims spaces and tabs, rejecting characters that would break the wire format.
pub(crate) fn normalize_value(value: &str) -> Result<String, MessageError> {
    let trimmed = value.trim_matches([' ', '\t']);
    ensure!(
        !trimmed.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)),
        MessageError::invalid_argument(format!("header value must be an RFC 7230 compatible string: {value:?}"))
    );
    Ok(trimmed.to_string())
}

fn normalize_values<I, V>(values: I) -> Result<Vec<String>, MessageError>
where
    I: IntoIterator<Item = V>,
    V: AsRef<str>,
{
    let values = values.into_iter().map(|v| normalize_value(v.as_ref())).collect::<Result<Vec<_>, _>>()?;
    ensure!(!values.is_empty(), MessageError::invalid_argument("header values must be a non-empty list"));
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let headers = Headers::new().with_header("Content-Type", " text/plain\t").unwrap();

        assert!(headers.has("content-type"));
        assert!(headers.has("CONTENT-TYPE"));
        assert_eq!(headers.get("cOnTeNt-TyPe"), ["text/plain"]);
        assert_eq!(headers.get_line("content-type"), "text/plain");
        assert!(headers.get("missing").is_empty());
        assert_eq!(headers.get_line("missing"), "");
    }

    #[test]
    fn with_header_replaces_and_renames() {
        let headers = Headers::new().with_added_header("x-key", "1").unwrap().with_added_header("X-KEY", "2").unwrap();
        assert_eq!(headers.get_line("x-key"), "1, 2");
        assert_eq!(headers.iter().next().unwrap().0, "x-key");

        let replaced = headers.with_header("X-Key", "3").unwrap();
        assert_eq!(replaced.get("x-key"), ["3"]);
        assert_eq!(replaced.iter().next().unwrap().0, "X-Key");

        // the source is untouched
        assert_eq!(headers.get_line("x-key"), "1, 2");
    }

    #[test]
    fn unchanged_value_is_equal() {
        let headers = Headers::new().with_header("a", "1").unwrap();
        assert_eq!(headers.with_header("a", "1").unwrap(), headers);
    }

    #[test]
    fn without_header_clones() {
        let headers = Headers::new().with_header("a", "1").unwrap().with_header("b", "2").unwrap();
        let removed = headers.without_header("A");

        assert!(!removed.has("a"));
        assert_eq!(removed.get("b"), ["2"]);
        assert!(headers.has("a"));
        assert_eq!(headers.without_header("missing"), headers);
    }

    #[test]
    fn from_pairs_merges_repeated_names() {
        let headers = Headers::from_pairs([("Accept", "a"), ("Host", "h"), ("accept", "b"), ("0", "numeric")]).unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("accept"), ["a", "b"]);
        assert_eq!(headers.get("0"), ["numeric"]);
    }

    #[test]
    fn set_first_moves_entry() {
        let mut headers = Headers::new().with_header("Accept", "*/*").unwrap().with_header("host", "old").unwrap();
        headers.set_first("Host", "example.com").unwrap();

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Host", "Accept"]);
        assert_eq!(headers.get_line("host"), "example.com");
    }

    #[test]
    fn invalid_input() {
        let headers = Headers::new();

        assert!(headers.with_header("bad name", "v").unwrap_err().is_invalid_argument());
        assert!(headers.with_header("", "v").unwrap_err().is_invalid_argument());
        assert!(headers.with_header("name:", "v").unwrap_err().is_invalid_argument());
        assert!(headers.with_header("name", "a\r\nb").unwrap_err().is_invalid_argument());
        assert!(headers.with_header_values("name", Vec::<&str>::new()).unwrap_err().is_invalid_argument());
        assert!(headers.with_added_header_values("name", Vec::<String>::new()).unwrap_err().is_invalid_argument());
    }
}
