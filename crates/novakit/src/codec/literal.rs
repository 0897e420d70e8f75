//! Decoder for the Python list/dict reprs embedded in CLI fields.
//!
//! The grammar is deliberately loose:
//! ```text
//! literal  := segment ( "," segment )*
//! segment  := junk* token? junk*
//! pair     := half ( ":" half )?        (split on the first colon only)
//! token    := "'" [^']* "'"             (first, shortest quoted run)
//! ```
//! A segment without a complete token contributes nothing. Brackets, braces
//! and `u` prefixes are junk and never inspected.

use std::collections::BTreeMap;

/// One comma-delimited piece of a literal.
#[derive(Debug, Clone, Copy)]
struct Segment<'a>(&'a str);

impl<'a> Segment<'a> {
    /// The first single-quoted token, without its quotes.
    fn token(self) -> Option<&'a str> {
        quoted_token(self.0)
    }

    /// Key and value tokens of a `'k': 'v'` segment.
    fn pair(self) -> (Option<&'a str>, Option<&'a str>) {
        match self.0.split_once(':') {
            Some((key, value)) => (quoted_token(key), quoted_token(value)),
            None => (quoted_token(self.0), None),
        }
    }
}

fn segments(s: &str) -> impl Iterator<Item = Segment<'_>> {
    s.split(',').map(Segment)
}

fn quoted_token(s: &str) -> Option<&str> {
    let start = s.find('\'')?;
    let rest = &s[start + 1..];
    let end = rest.find('\'')?;
    Some(&rest[..end])
}

/// Decode a list repr such as `[u'node-1', u'node-2']`.
///
/// Order is preserved; segments without a quoted token are dropped.
pub fn decode_quoted_list(s: &str) -> Vec<String> {
    segments(s)
        .filter_map(Segment::token)
        .map(str::to_string)
        .collect()
}

/// Decode a dict repr such as `{u'ssd': u'true', u'gpu': u'false'}`.
///
/// A pair is dropped only when neither side has a quoted token. When just
/// one side parses, the other is stored as an empty string: `{'a': 1}`
/// yields `a => ""`.
pub fn decode_quoted_map(s: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for segment in segments(s) {
        let (key, value) = segment.pair();
        if key.is_none() && value.is_none() {
            continue;
        }
        map.insert(
            key.unwrap_or_default().to_string(),
            value.unwrap_or_default().to_string(),
        );
    }
    map
}
