use std::collections::BTreeMap;

use serde_json::Value;

/// Metadata of a document, each key holding one or more raw values in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata(BTreeMap<String, Vec<String>>);

impl Metadata {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// The first value stored under `key`
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Decodes the document ids referenced under `key`, see [parse_id_list]
    pub fn id_list(&self, key: &str) -> Vec<i64> {
        self.first(key).map(parse_id_list).unwrap_or_default()
    }

    /// Entries whose key starts with `prefix`, with the prefix stripped, ordered by key
    ///
    /// Only the first value of each entry is kept. Entries without any value are skipped.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.0.iter().filter_map(move |(key, values)| {
            let field = key.strip_prefix(prefix)?;
            let value = values.first()?;
            Some((field, value.as_str()))
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut metadata = Self::default();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

fn json_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(string) => string.trim().parse().ok(),
        _ => None,
    }
}

/// A value of a PHP-serialized payload, as far as id lists are concerned
#[derive(Debug, PartialEq)]
enum Serialized<'a> {
    Int(i64),
    Str(&'a str),
    /// Booleans, floats, nulls and nested arrays
    Ignored,
}

impl Serialized<'_> {
    fn id(&self) -> Option<i64> {
        match self {
            Serialized::Int(id) => Some(*id),
            Serialized::Str(string) => string.trim().parse().ok(),
            Serialized::Ignored => None,
        }
    }
}

/// Reads a PHP-serialized payload from left to right
struct SerializedReader<'a> {
    rest: &'a str,
}

impl<'a> SerializedReader<'a> {
    fn eat(&mut self, token: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(token)?;
        Some(())
    }

    fn until(&mut self, delimiter: char) -> Option<&'a str> {
        let (head, tail) = self.rest.split_once(delimiter)?;
        self.rest = tail;
        Some(head)
    }

    fn value(&mut self) -> Option<Serialized<'a>> {
        if self.eat("N;").is_some() {
            return Some(Serialized::Ignored);
        }
        match self.until(':')? {
            "i" => Some(Serialized::Int(self.until(';')?.parse().ok()?)),
            "b" | "d" => {
                self.until(';')?;
                Some(Serialized::Ignored)
            }
            "s" => {
                // the length counts bytes, the string may hold quotes
                let len: usize = self.until(':')?.parse().ok()?;
                self.eat("\"")?;
                let string = self.rest.get(..len)?;
                self.rest = &self.rest[len..];
                self.eat("\";")?;
                Some(Serialized::Str(string))
            }
            "a" => {
                self.array()?;
                Some(Serialized::Ignored)
            }
            _ => None,
        }
    }

    /// Values of an array whose `a:` tag was already read, keys are dropped
    fn array(&mut self) -> Option<Vec<Serialized<'a>>> {
        let len: usize = self.until(':')?.parse().ok()?;
        self.eat("{")?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            self.value()?;
            values.push(self.value()?);
        }
        self.eat("}")?;
        Some(values)
    }
}

/// Decodes a list of ids stored in a metadata value
///
/// The value is either a JSON array, a PHP-serialized array (`a:2:{i:0;i:12;i:1;s:2:"15";}`)
/// or a single integer. Elements which are not ids are ignored.
pub fn parse_id_list(raw: &str) -> Vec<i64> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return match serde_json::from_str::<Vec<Value>>(raw) {
            Ok(values) => values.iter().filter_map(json_id).collect(),
            Err(error) => {
                tracing::warn!(%error, "metadata holds an invalid JSON id list");
                Vec::new()
            }
        };
    }
    if let Some(body) = raw.strip_prefix("a:") {
        let mut reader = SerializedReader { rest: body };
        let Some(values) = reader.array() else {
            tracing::warn!("metadata holds a malformed serialized array");
            return Vec::new();
        };
        return values.iter().filter_map(Serialized::id).collect();
    }
    raw.parse().map(|id| vec![id]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::json_numbers("[12, 15]", vec![12, 15])]
    #[case::json_strings(r#"["12","x","15"]"#, vec![12, 15])]
    #[case::serialized_ints("a:2:{i:0;i:12;i:1;i:15;}", vec![12, 15])]
    #[case::serialized_strings(r#"a:2:{i:0;s:2:"12";i:1;s:3:"150";}"#, vec![12, 150])]
    #[case::serialized_empty("a:0:{}", vec![])]
    #[case::serialized_bool("a:2:{i:0;b:0;i:1;i:15;}", vec![15])]
    #[case::serialized_null("a:2:{i:0;N;i:1;i:15;}", vec![15])]
    #[case::serialized_float("a:2:{i:0;d:1.5;i:1;i:15;}", vec![15])]
    #[case::serialized_quoted_string(r#"a:2:{i:0;s:3:"a"b";i:1;i:15;}"#, vec![15])]
    #[case::serialized_nested(r#"a:2:{i:0;a:1:{i:0;i:9;}s:1:"k";i:15;}"#, vec![15])]
    #[case::serialized_string_keys(r#"a:1:{s:5:"first";i:12;}"#, vec![12])]
    #[case::serialized_truncated("a:2:{i:0;i:12;i:1;", vec![])]
    #[case::serialized_wrong_length(r#"a:1:{i:0;s:9:"12";}"#, vec![])]
    #[case::single("42", vec![42])]
    #[case::padded(" 42\n", vec![42])]
    #[case::empty("", vec![])]
    #[case::garbage("not an id", vec![])]
    #[case::broken_json("[1,", vec![])]
    fn decodes_id_lists(#[case] raw: &str, #[case] expected: Vec<i64>) {
        assert_eq!(parse_id_list(raw), expected);
    }

    #[test]
    fn prefixed_entries_are_stripped_and_ordered() {
        let metadata = Metadata::from_iter([
            ("purple_custom_meta_size", "XL"),
            ("unrelated", "x"),
            ("purple_custom_meta_color", "red"),
            ("purple_custom_meta_color", "blue"),
        ]);
        assert_eq!(
            metadata
                .with_prefix("purple_custom_meta_")
                .collect::<Vec<_>>(),
            vec![("color", "red"), ("size", "XL")]
        );
    }

    #[test]
    fn id_list_reads_the_first_value() {
        let metadata = Metadata::from_iter([("purple_in_issues", "[3]"), ("purple_in_issues", "[4]")]);
        assert_eq!(metadata.id_list("purple_in_issues"), vec![3]);
        assert_eq!(metadata.id_list("missing"), Vec::<i64>::new());
        assert_eq!(metadata.first("purple_in_issues"), Some("[3]"));
    }
}
