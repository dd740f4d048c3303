//! An ordered multimap of request parameters.
//!
//! [`ParamMap`] holds the raw query-string parameters of one request. A key
//! may appear many times (`col____list=1&col____list=2`), and iteration
//! follows the order keys first appeared so that anything derived from the
//! map is deterministic.

/// An insertion-ordered dictionary mapping parameter names to value lists.
///
/// [`get`](ParamMap::get) returns the **last** value for a key, while
/// [`get_list`](ParamMap::get_list) returns all of them.
///
/// # Examples
///
/// ```
/// use quickcrud_core::utils::ParamMap;
///
/// let params = ParamMap::parse("id____list=0&id____list=1&limit=10");
/// assert_eq!(params.get("limit"), Some("10"));
/// assert_eq!(params.get_list("id____list"), vec!["0", "1"]);
/// assert_eq!(params.keys().collect::<Vec<_>>(), vec!["id____list", "limit"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ParamMap {
    /// Creates an empty `ParamMap`.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parses a URL query string (`"a=1&b=2&a=3"`) into a `ParamMap`.
    ///
    /// Percent-encoding and `+`-as-space are decoded. Pairs without `=` are
    /// kept with an empty value.
    pub fn parse(query_string: &str) -> Self {
        url::form_urlencoded::parse(query_string.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Builder-style variant of [`append`](ParamMap::append).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(key, value);
        self
    }

    /// Returns the last value for the key, or `None` if the key is absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values(key).and_then(|v| v.last()).map(String::as_str)
    }

    /// Returns every value for the key in arrival order (empty if absent).
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.values(key)
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values(key).is_some()
    }

    /// Returns the distinct keys in first-appearance order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Returns `(key, values)` pairs in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn values(&self, key: &str) -> Option<&Vec<String>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.append(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let params = ParamMap::new();
        assert!(params.is_empty());
        assert_eq!(params.len(), 0);
        assert_eq!(params.get("x"), None);
        assert!(params.get_list("x").is_empty());
    }

    #[test]
    fn test_get_returns_last() {
        let params = ParamMap::new().with("offset", "1").with("offset", "2");
        assert_eq!(params.get("offset"), Some("2"));
        assert_eq!(params.get_list("offset"), vec!["1", "2"]);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_parse_decodes() {
        let params = ParamMap::parse("order_by_columns=primary_key%3A+DESC&s=a%20b");
        assert_eq!(params.get("order_by_columns"), Some("primary_key: DESC"));
        assert_eq!(params.get("s"), Some("a b"));
    }

    #[test]
    fn test_parse_empty_and_bare_keys() {
        assert!(ParamMap::parse("").is_empty());
        let params = ParamMap::parse("flag&x=1");
        assert_eq!(params.get("flag"), Some(""));
        assert!(params.contains_key("flag"));
    }

    #[test]
    fn test_key_order_is_first_appearance() {
        let params = ParamMap::parse("b=1&a=2&b=3");
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        let grouped: Vec<(&str, usize)> = params.iter().map(|(k, v)| (k, v.len())).collect();
        assert_eq!(grouped, vec![("b", 2), ("a", 1)]);
    }

    #[test]
    fn test_from_iterator() {
        let params: ParamMap = vec![("x", "1"), ("y", "2"), ("x", "3")].into_iter().collect();
        assert_eq!(params.get_list("x"), vec!["1", "3"]);
        assert_eq!(params.get("y"), Some("2"));
    }

    #[test]
    fn test_equality_is_order_sensitive_per_key() {
        let a = ParamMap::parse("x=1&x=2");
        let b = ParamMap::parse("x=1&x=2");
        let c = ParamMap::parse("x=2&x=1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
