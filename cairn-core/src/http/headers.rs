//! Ordered, case-insensitive header collection.
//!
//! Headers keep their wire order so responses serialize the way they were
//! assembled and duplicate request headers stay observable. Lookup is
//! case-insensitive and returns the first occurrence, which is also the
//! rule applied when a client repeats a header.

/// Header collection backing both [`crate::http::RequestModel`] and
/// [`crate::http::ResponseModel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping any existing occurrence of the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace the first occurrence of `name` (any casing) or append.
    ///
    /// Later duplicates are dropped so the map holds a single entry for the
    /// name afterwards.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut slot = None;
        let mut idx = 0;
        self.entries.retain(|(n, _)| {
            let keep = if n.eq_ignore_ascii_case(&name) {
                if slot.is_none() {
                    slot = Some(idx);
                    true
                } else {
                    false
                }
            } else {
                true
            };
            if keep {
                idx += 1;
            }
            keep
        });
        match slot {
            Some(i) => self.entries[i] = (name, value),
            None => self.entries.push((name, value)),
        }
    }

    /// First value stored under `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove every occurrence of `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a str);
    type IntoIter = std::vec::IntoIter<(&'a str, &'a str)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut headers = HeaderMap::new();
        headers.append("Content-Type", "text/html");
        assert_eq!(headers.get("content-type"), Some("text/html"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(headers.get("Content-Length"), None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut headers = HeaderMap::new();
        headers.append("X-Forwarded-For", "10.0.0.1");
        headers.append("x-forwarded-for", "10.0.0.2");
        assert_eq!(headers.get("X-Forwarded-For"), Some("10.0.0.1"));
        assert_eq!(headers.get_all("X-Forwarded-For").count(), 2);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut headers = HeaderMap::new();
        headers.append("Date", "a");
        headers.append("Connection", "keep-alive");
        headers.append("connection", "close");
        headers.set("Connection", "close");
        let order: Vec<_> = headers.iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(order, vec!["Date", "Connection"]);
        assert_eq!(headers.get("connection"), Some("close"));
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut headers = HeaderMap::new();
        headers.append("B", "2");
        headers.append("A", "1");
        headers.append("C", "3");
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_remove_all_occurrences() {
        let mut headers = HeaderMap::new();
        headers.append("Cookie", "a=1");
        headers.append("cookie", "b=2");
        headers.remove("COOKIE");
        assert!(headers.is_empty());
    }
}
