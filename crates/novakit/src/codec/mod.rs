//! Parsers for the text the openstack CLI prints.
//!
//! Two outer shapes are consumed:
//! ```text
//! "ID","Name","Availability Zone","Properties"      <- --format csv
//! 1,"compute-ssd","az1","{u'ssd': u'true'}"
//!
//! id="1"                                            <- --format shell
//! hosts="[u'node-1', u'node-2']"
//! ```
//! Host and property fields embed Python literal reprs, decoded by
//! [`literal`]. Nothing in this module fails: missing or malformed input
//! yields empty values.

pub mod literal;

pub use literal::{decode_quoted_list, decode_quoted_map};

use std::collections::BTreeMap;

/// One decoded object, keyed by normalized field name.
pub type Record = BTreeMap<String, String>;

/// Normalize a CLI field label into a record key.
///
/// `"Availability Zone"` becomes `availability_zone`.
pub fn normalize_key(label: &str) -> String {
    label.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Parse `--format csv` output into one record per data row.
pub fn parse_csv(text: &str) -> Vec<Record> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(normalize_key).collect(),
        Err(e) => {
            log::debug!("Unreadable csv header: {e}");
            return Vec::new();
        }
    };

    reader
        .records()
        .filter_map(|row| match row {
            Ok(row) => Some(row),
            Err(e) => {
                log::debug!("Skipping csv row: {e}");
                None
            }
        })
        .map(|row| {
            headers
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_string))
                .collect()
        })
        .collect()
}

/// Parse `--format shell` output (`key="value"` lines) into a record.
pub fn parse_shell(text: &str) -> Record {
    let mut record = Record::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        record.insert(normalize_key(key), unquote(value.trim()));
    }

    record
}

/// Strip one pair of surrounding double quotes and undo shell escapes.
fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\' | '$' | '`')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Field lookup that treats a missing key as empty.
pub fn field<'a>(record: &'a Record, key: &str) -> &'a str {
    record.get(key).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#""ID","Name","Availability Zone","Properties"
1,"just","simple","{u'nice': u'cookie'}"
2,"other","","{}"
"#;

    const SHOW: &str = r#"availability_zone="simple"
id="1"
name="just"
properties="{u'nice': u'cookie'}"
hosts="[u'example']"
"#;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Availability Zone"), "availability_zone");
        assert_eq!(normalize_key("ID"), "id");
        assert_eq!(normalize_key(" created-at "), "created_at");
    }

    #[test]
    fn test_parse_csv() {
        let rows = parse_csv(LIST);
        assert_eq!(rows.len(), 2);
        assert_eq!(field(&rows[0], "id"), "1");
        assert_eq!(field(&rows[0], "name"), "just");
        assert_eq!(field(&rows[0], "availability_zone"), "simple");
        assert_eq!(field(&rows[0], "properties"), "{u'nice': u'cookie'}");
        assert_eq!(field(&rows[1], "availability_zone"), "");
    }

    #[test]
    fn test_parse_csv_header_only() {
        let rows = parse_csv("\"ID\",\"Name\",\"Availability Zone\",\"Properties\"\n");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_csv_empty_and_short_rows() {
        assert!(parse_csv("").is_empty());

        let rows = parse_csv("\"ID\",\"Name\"\n7\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(field(&rows[0], "id"), "7");
        assert_eq!(field(&rows[0], "name"), "");
    }

    #[test]
    fn test_parse_shell() {
        let record = parse_shell(SHOW);
        assert_eq!(field(&record, "id"), "1");
        assert_eq!(field(&record, "name"), "just");
        assert_eq!(field(&record, "hosts"), "[u'example']");
        assert_eq!(field(&record, "properties"), "{u'nice': u'cookie'}");
        assert_eq!(field(&record, "missing"), "");
    }

    #[test]
    fn test_parse_shell_lenient() {
        let record = parse_shell("garbage line\nname=\"a=b\"\n\nzone=plain\n");
        assert_eq!(record.len(), 2);
        assert_eq!(field(&record, "name"), "a=b");
        assert_eq!(field(&record, "zone"), "plain");
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""say \"hi\"""#), r#"say "hi""#);
        assert_eq!(unquote(r#""a\\b""#), r"a\b");
        assert_eq!(unquote(r#""keep \n""#), r"keep \n");
    }
}
