//! Query-string and form-field decoding with bracket notation.
//!
//! Parameter names may carry a bracket suffix (`user[address][city]`,
//! `items[]`) that builds nested maps, the way PHP's `parse_str` populates
//! superglobals. The same assignment routine is reused for urlencoded
//! bodies and multipart field names, so all three sources merge under one
//! policy.

/// A decoded parameter value: either a scalar or a nested map.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Map(ParamMap),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(t) => Some(t),
            ParamValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&ParamMap> {
        match self {
            ParamValue::Map(m) => Some(m),
            ParamValue::Text(_) => None,
        }
    }
}

/// Ordered map of parameter names to values.
///
/// Entries keep first-assignment order even when a value is overwritten
/// later, so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Scalar value under `key`, if present and not a nested map.
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_text)
    }

    pub fn get_map(&self, key: &str) -> Option<&ParamMap> {
        self.get(key).and_then(ParamValue::as_map)
    }

    /// Overwrite the value under `key`, keeping its original position.
    pub fn set(&mut self, key: impl Into<String>, value: ParamValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Next numeric index for an `[]` append: highest existing numeric key
    /// plus one, or zero for a map without numeric keys.
    fn next_index(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|(k, _)| k.parse::<usize>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0)
    }

    /// Nested map under `key`, created on demand. An existing scalar at the
    /// slot is replaced by an empty map, mirroring how later structured
    /// assignments win over earlier scalar ones.
    fn entry_map(&mut self, key: &str) -> &mut ParamMap {
        let idx = match self.entries.iter().position(|(k, _)| k == key) {
            Some(i) => i,
            None => {
                self.entries
                    .push((key.to_string(), ParamValue::Map(ParamMap::new())));
                self.entries.len() - 1
            }
        };
        let slot = &mut self.entries[idx].1;
        if !matches!(slot, ParamValue::Map(_)) {
            *slot = ParamValue::Map(ParamMap::new());
        }
        match slot {
            ParamValue::Map(map) => map,
            ParamValue::Text(_) => unreachable!("slot was just forced to a map"),
        }
    }
}

/// One parsed bracket group of a parameter name.
enum Segment {
    /// `[]`, appends at the next numeric index.
    Push,
    /// `[name]`, assigns under `name`.
    Key(String),
}

/// Split `user[address][]` into root and bracket segments.
///
/// Names whose bracket suffix is unbalanced, or that start with `[`, are
/// treated as plain scalar names.
fn split_brackets(key: &str) -> (String, Option<Vec<Segment>>) {
    let Some(open) = key.find('[') else {
        return (key.to_string(), None);
    };
    let root = &key[..open];
    if root.is_empty() {
        return (key.to_string(), None);
    }
    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return (key.to_string(), None);
        }
        let Some(close) = rest.find(']') else {
            return (key.to_string(), None);
        };
        let inner = &rest[1..close];
        segments.push(if inner.is_empty() {
            Segment::Push
        } else {
            Segment::Key(inner.to_string())
        });
        rest = &rest[close + 1..];
    }
    (root.to_string(), Some(segments))
}

/// Assign one decoded `name=value` pair into `map` under the bracket rules:
/// plain names overwrite, `[]` appends at the next numeric index, `[sub]`
/// overwrites that sub-key, and intermediate scalars are replaced by maps.
pub fn assign(map: &mut ParamMap, raw_key: &str, value: String) {
    let (root, segments) = split_brackets(raw_key);
    let Some(segments) = segments else {
        map.set(root, ParamValue::Text(value));
        return;
    };
    if segments.is_empty() {
        map.set(root, ParamValue::Text(value));
        return;
    }

    let (last, inner) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };
    let mut current = map.entry_map(&root);
    for segment in inner {
        let key = match segment {
            Segment::Push => current.next_index().to_string(),
            Segment::Key(k) => k.clone(),
        };
        current = current.entry_map(&key);
    }
    let key = match last {
        Segment::Push => current.next_index().to_string(),
        Segment::Key(k) => k.clone(),
    };
    current.set(key, ParamValue::Text(value));
}

/// Parse a query string (with or without leading `?`) into `map`.
///
/// Pairs split on `&`, each on the first `=`; a pair without `=` yields an
/// empty-string value. Names and values are urldecoded before the bracket
/// rules apply.
pub fn parse_into(query: &str, map: &mut ParamMap) {
    let query = query.strip_prefix('?').unwrap_or(query);
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = url_decode(raw_key);
        if key.is_empty() {
            continue;
        }
        assign(map, &key, url_decode(raw_value));
    }
}

/// Convenience wrapper building a fresh map.
pub fn parse_str(query: &str) -> ParamMap {
    let mut map = ParamMap::new();
    parse_into(query, &mut map);
    map
}

/// Serialize a parameter map back to `a=1&b%5B0%5D=x` form.
pub fn to_query_string(map: &ParamMap) -> String {
    let mut pairs = Vec::new();
    for (key, value) in map.iter() {
        collect_pairs(url_encode(key), value, &mut pairs);
    }
    pairs.join("&")
}

fn collect_pairs(prefix: String, value: &ParamValue, pairs: &mut Vec<String>) {
    match value {
        ParamValue::Text(text) => pairs.push(format!("{}={}", prefix, url_encode(text))),
        ParamValue::Map(map) => {
            for (key, nested) in map.iter() {
                collect_pairs(format!("{}%5B{}%5D", prefix, url_encode(key)), nested, pairs);
            }
        }
    }
}

/// Decode `+` to space and `%XX` escapes; an escape with bad hex digits is
/// kept literally. Falls back to the raw input if the decoded bytes are not
/// valid UTF-8.
pub fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                result.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match decode_hex_pair(&bytes[i + 1..i + 3]) {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                result.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8(result).unwrap_or_else(|_| s.to_string())
}

/// Percent-decoding without the `+`-to-space rule, for URI paths.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            if let Some(byte) = decode_hex_pair(&bytes[i + 1..i + 3]) {
                result.push(byte);
                i += 3;
                continue;
            }
        }
        result.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(result).unwrap_or_else(|_| s.to_string())
}

fn decode_hex_pair(pair: &[u8]) -> Option<u8> {
    if pair.len() != 2 {
        return None;
    }
    std::str::from_utf8(pair)
        .ok()
        .and_then(|hex| u8::from_str_radix(hex, 16).ok())
}

/// Encode a parameter name or value: alphanumerics and `-_.` pass through,
/// space becomes `+`, everything else `%XX`.
pub fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => out.push(byte as char),
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_and_decode() {
        let map = parse_str("a=1&name=J%C3%BCrgen+M");
        assert_eq!(map.get_text("a"), Some("1"));
        assert_eq!(map.get_text("name"), Some("Jürgen M"));
    }

    #[test]
    fn test_pair_without_equals() {
        let map = parse_str("?flag&x=2");
        assert_eq!(map.get_text("flag"), Some(""));
        assert_eq!(map.get_text("x"), Some("2"));
    }

    #[test]
    fn test_duplicate_scalar_overwrites() {
        let map = parse_str("a=1&a=2");
        assert_eq!(map.get_text("a"), Some("2"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_empty_brackets_append() {
        let map = parse_str("b[]=x&b[]=y");
        let b = map.get_map("b").unwrap();
        assert_eq!(b.get_text("0"), Some("x"));
        assert_eq!(b.get_text("1"), Some("y"));
    }

    #[test]
    fn test_append_after_explicit_numeric_key() {
        let map = parse_str("b[4]=x&b[]=y");
        let b = map.get_map("b").unwrap();
        assert_eq!(b.get_text("4"), Some("x"));
        assert_eq!(b.get_text("5"), Some("y"));
    }

    #[test]
    fn test_nested_maps() {
        let map = parse_str("c[k]=v&c[k2][k3]=deep");
        let c = map.get_map("c").unwrap();
        assert_eq!(c.get_text("k"), Some("v"));
        assert_eq!(c.get_map("k2").unwrap().get_text("k3"), Some("deep"));
    }

    #[test]
    fn test_scalar_replaced_by_map() {
        let map = parse_str("b=1&b[]=2");
        let b = map.get_map("b").unwrap();
        assert_eq!(b.get_text("0"), Some("2"));
    }

    #[test]
    fn test_map_replaced_by_scalar() {
        let map = parse_str("b[]=1&b=plain");
        assert_eq!(map.get_text("b"), Some("plain"));
    }

    #[test]
    fn test_encoded_bracket_key() {
        let map = parse_str("user%5Bcity%5D=Kassel");
        assert_eq!(map.get_map("user").unwrap().get_text("city"), Some("Kassel"));
    }

    #[test]
    fn test_unbalanced_brackets_stay_literal() {
        let map = parse_str("a%5Bx=1");
        assert_eq!(map.get_text("a[x"), Some("1"));
    }

    #[test]
    fn test_leading_question_mark_and_empty_pairs() {
        let map = parse_str("?a=1&&b=2");
        assert_eq!(map.get_text("a"), Some("1"));
        assert_eq!(map.get_text("b"), Some("2"));
    }

    #[test]
    fn test_bad_escape_kept_literal() {
        assert_eq!(url_decode("100%zz"), "100%zz");
        assert_eq!(url_decode("a%2"), "a%2");
    }

    #[test]
    fn test_round_trip_serialization() {
        let map = parse_str("a=1&b[]=x+y&c[k]=v");
        let rendered = to_query_string(&map);
        assert_eq!(rendered, "a=1&b%5B0%5D=x+y&c%5Bk%5D=v");
        let reparsed = parse_str(&rendered);
        assert_eq!(reparsed, map);
    }

    #[test]
    fn test_percent_decode_keeps_plus() {
        assert_eq!(percent_decode("/a+b/%C3%A9"), "/a+b/é");
    }
}
