//! An in-process stand-in for the key-value store
//!
//! It understands the small set of commands [crate::Connection] sends, keeps everything in a
//! shared map and lets tests inspect the resulting state. Writes to selected keys can be
//! rejected to exercise failure paths.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use deadpool_redis::redis::Arg;
use deadpool_redis::redis::Cmd;
use deadpool_redis::redis::ErrorKind;
use deadpool_redis::redis::RedisError;
use deadpool_redis::redis::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Value(String),
    Hash(BTreeMap<String, String>),
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    rejected_keys: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

fn wrong_type() -> RedisError {
    RedisError::from((
        ErrorKind::ResponseError,
        "WRONGTYPE Operation against a key holding the wrong kind of value",
    ))
}

fn wrong_arity(cmd_name: &str) -> RedisError {
    RedisError::from((
        ErrorKind::ResponseError,
        "wrong number of arguments",
        cmd_name.to_owned(),
    ))
}

fn bulk(value: &str) -> Value {
    Value::BulkString(value.as_bytes().to_vec())
}

/// Redis glob matching, restricted to `*` and `?`
fn glob_match(pattern: &[u8], candidate: &[u8]) -> bool {
    match (pattern.split_first(), candidate.split_first()) {
        (None, None) => true,
        (Some((b'*', rest)), _) => {
            glob_match(rest, candidate)
                || (!candidate.is_empty() && glob_match(pattern, &candidate[1..]))
        }
        (Some((b'?', rest)), Some((_, candidate_rest))) => glob_match(rest, candidate_rest),
        (Some((p, rest)), Some((c, candidate_rest))) if p == c => glob_match(rest, candidate_rest),
        _ => false,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> BTreeMap<String, Entry> {
        self.lock().entries.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().entries.keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    pub fn hash(&self, key: &str) -> Option<BTreeMap<String, String>> {
        match self.lock().entries.get(key) {
            Some(Entry::Hash(fields)) => Some(fields.clone()),
            _ => None,
        }
    }

    pub fn value(&self, key: &str) -> Option<String> {
        match self.lock().entries.get(key) {
            Some(Entry::Value(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn insert_hash<K, V>(&self, key: &str, fields: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(field, value)| (field.into(), value.into()))
            .collect();
        self.lock()
            .entries
            .insert(key.to_owned(), Entry::Hash(fields));
    }

    /// Makes every following write on `key` fail
    pub fn reject_writes_to(&self, key: &str) {
        self.lock().rejected_keys.insert(key.to_owned());
    }

    pub(crate) fn execute(&self, cmd: &Cmd) -> Result<Value, RedisError> {
        let args = cmd
            .args_iter()
            .map(|arg| match arg {
                Arg::Simple(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
                Arg::Cursor => Err(RedisError::from((
                    ErrorKind::ClientError,
                    "cursor arguments are not supported by the in-memory store",
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let (cmd_name, args) = args
            .split_first()
            .ok_or((ErrorKind::ClientError, "missing a command instruction"))?;
        let cmd_name = cmd_name.to_ascii_uppercase();
        let mut state = self.lock();
        let writes = matches!(cmd_name.as_str(), "SET" | "DEL" | "HSET" | "HMSET");
        if writes && args.iter().any(|key| state.rejected_keys.contains(key)) {
            return Err(RedisError::from((
                ErrorKind::ResponseError,
                "write rejected by the in-memory store",
                cmd_name.clone(),
            )));
        }

        match (cmd_name.as_str(), args) {
            ("PING", _) => Ok(Value::SimpleString("PONG".to_string())),
            ("GET", [key]) => match state.entries.get(key) {
                Some(Entry::Value(value)) => Ok(bulk(value)),
                Some(Entry::Hash(_)) => Err(wrong_type()),
                None => Ok(Value::Nil),
            },
            ("SET", [key, value]) => {
                state
                    .entries
                    .insert(key.clone(), Entry::Value(value.clone()));
                Ok(Value::Okay)
            }
            ("DEL", keys) if !keys.is_empty() => {
                let removed = keys
                    .iter()
                    .filter(|key| state.entries.remove(*key).is_some())
                    .count();
                Ok(Value::Int(removed as i64))
            }
            ("HSET" | "HMSET", [key, pairs @ ..]) if !pairs.is_empty() && pairs.len() % 2 == 0 => {
                let fields = match state
                    .entries
                    .entry(key.clone())
                    .or_insert_with(|| Entry::Hash(BTreeMap::new()))
                {
                    Entry::Hash(fields) => fields,
                    Entry::Value(_) => return Err(wrong_type()),
                };
                let mut added = 0;
                for pair in pairs.chunks(2) {
                    if fields.insert(pair[0].clone(), pair[1].clone()).is_none() {
                        added += 1;
                    }
                }
                if cmd_name == "HMSET" {
                    Ok(Value::Okay)
                } else {
                    Ok(Value::Int(added))
                }
            }
            ("HGET", [key, field]) => match state.entries.get(key) {
                Some(Entry::Hash(fields)) => Ok(fields.get(field).map_or(Value::Nil, |v| bulk(v))),
                Some(Entry::Value(_)) => Err(wrong_type()),
                None => Ok(Value::Nil),
            },
            ("HGETALL", [key]) => match state.entries.get(key) {
                Some(Entry::Hash(fields)) => Ok(Value::Array(
                    fields
                        .iter()
                        .flat_map(|(field, value)| [bulk(field), bulk(value)])
                        .collect(),
                )),
                Some(Entry::Value(_)) => Err(wrong_type()),
                None => Ok(Value::Array(vec![])),
            },
            ("SCAN", [_cursor, options @ ..]) => {
                let pattern = options
                    .chunks(2)
                    .find(|option| option[0].eq_ignore_ascii_case("MATCH"))
                    .and_then(|option| option.get(1))
                    .map_or("*", String::as_str);
                // the whole keyspace is returned at once: the cursor is always exhausted
                let keys = state
                    .entries
                    .keys()
                    .filter(|key| glob_match(pattern.as_bytes(), key.as_bytes()))
                    .map(|key| bulk(key))
                    .collect();
                Ok(Value::Array(vec![bulk("0"), Value::Array(keys)]))
            }
            (
                "GET" | "SET" | "DEL" | "HSET" | "HMSET" | "HGET" | "HGETALL" | "SCAN",
                _,
            ) => Err(wrong_arity(&cmd_name)),
            _ => Err(RedisError::from((
                ErrorKind::ClientError,
                "command not supported by the in-memory store",
                cmd_name.clone(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Client;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn glob_patterns() {
        assert!(glob_match(b"post:*", b"post:42"));
        assert!(glob_match(b"post:*", b"post:"));
        assert!(!glob_match(b"post:*", b"posts:42"));
        assert!(glob_match(b"block:?1", b"block:a1"));
        assert!(glob_match(b"*", b"anything"));
        assert!(!glob_match(b"tag:1", b"tag:12"));
    }

    #[tokio::test]
    async fn replace_hash_drops_previous_fields() {
        let store = MemoryStore::new();
        let mut conn = Client::new_memory(store.clone())
            .get_connection()
            .await
            .unwrap();

        conn.replace_hash("post:1", &fields(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        conn.replace_hash("post:1", &fields(&[("a", "3")]))
            .await
            .unwrap();

        assert_eq!(
            store.hash("post:1"),
            Some(BTreeMap::from([("a".to_owned(), "3".to_owned())]))
        );
        assert_eq!(conn.hash_field("post:1", "a").await.unwrap(), Some("3".into()));
        assert_eq!(conn.hash_field("post:1", "b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_hash_with_no_fields_removes_the_key() {
        let store = MemoryStore::new();
        store.insert_hash("tags:1", [("3", "{}")]);
        let mut conn = Client::new_memory(store.clone())
            .get_connection()
            .await
            .unwrap();

        conn.replace_hash("tags:1", &[]).await.unwrap();

        assert!(!store.contains("tags:1"));
    }

    #[tokio::test]
    async fn scan_keys_filters_by_pattern() {
        let store = MemoryStore::new();
        store.insert_hash("post:2", [("postId", "2")]);
        store.insert_hash("post:10", [("postId", "10")]);
        store.insert_hash("block:a1", [("blockName", "core/paragraph")]);
        let mut conn = Client::new_memory(store).get_connection().await.unwrap();

        let keys = conn.scan_keys("post:*").await.unwrap();

        assert_eq!(keys, vec!["post:10".to_owned(), "post:2".to_owned()]);
    }

    #[tokio::test]
    async fn rejected_writes_surface_as_errors() {
        let store = MemoryStore::new();
        store.reject_writes_to("custom_fields:1");
        let mut conn = Client::new_memory(store.clone())
            .get_connection()
            .await
            .unwrap();

        assert!(conn.replace_value("custom_fields:1", "[]").await.is_err());
        assert!(conn.replace_value("custom_fields:2", "[]").await.is_ok());
        assert_eq!(store.value("custom_fields:2"), Some("[]".to_owned()));
    }

    #[tokio::test]
    async fn json_set_stores_the_serialized_value() {
        let store = MemoryStore::new();
        let mut conn = Client::new_memory(store.clone())
            .get_connection()
            .await
            .unwrap();

        conn.json_set("custom_fields:3", &vec![serde_json::json!({"field": "color"})])
            .await
            .unwrap();

        assert_eq!(
            store.value("custom_fields:3"),
            Some(r#"[{"field":"color"}]"#.to_owned())
        );
    }
}
