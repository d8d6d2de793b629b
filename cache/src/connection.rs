use std::fmt::Debug;

use deadpool_redis::redis;
use deadpool_redis::redis::Arg;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::redis::Cmd;
use deadpool_redis::redis::ErrorKind;
use deadpool_redis::redis::Pipeline;
use deadpool_redis::redis::RedisError;
use deadpool_redis::redis::RedisFuture;
use deadpool_redis::redis::Value;
use deadpool_redis::redis::aio::ConnectionLike;
use futures::FutureExt;
use futures::future;
use serde::Serialize;

/// Number of keys hinted to the server for each `SCAN` round trip
const SCAN_BATCH_SIZE: usize = 500;

pub struct Connection {
    inner: ConnectionInner,
}

pub(crate) enum ConnectionInner {
    Tokio(deadpool_redis::Connection),
    DryRun,
    #[cfg(any(test, feature = "testing"))]
    Memory(crate::memory::MemoryStore),
    #[cfg(feature = "mock")]
    Mock(redis_test::MockRedisConnection),
}

fn dry_run_cmd_handler(cmd: &Cmd) -> Result<Value, RedisError> {
    let mut args = cmd.args_iter().map(|arg| match arg {
        Arg::Simple(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Arg::Cursor => "<cursor>".to_owned(),
    });
    let cmd_name = args
        .next()
        .ok_or((ErrorKind::ClientError, "missing a command instruction"))?
        .to_ascii_uppercase();
    let args = args.collect::<Vec<_>>();
    tracing::info!(command = %cmd_name, ?args, "dry run: command not sent");
    match cmd_name.as_str() {
        "PING" => Ok(Value::SimpleString("PONG".to_string())),
        "DEL" => Ok(Value::Int(0)),
        "GET" | "HGET" => Ok(Value::Nil),
        "HGETALL" => Ok(Value::Array(vec![])),
        "SCAN" => Ok(Value::Array(vec![
            Value::BulkString(b"0".to_vec()),
            Value::Array(vec![]),
        ])),
        _ => Ok(Value::Okay),
    }
}

impl ConnectionLike for Connection {
    fn req_packed_command<'a>(&'a mut self, cmd: &'a Cmd) -> RedisFuture<'a, Value> {
        match &mut self.inner {
            ConnectionInner::Tokio(connection) => connection.req_packed_command(cmd),
            ConnectionInner::DryRun => future::ready(dry_run_cmd_handler(cmd)).boxed(),
            #[cfg(any(test, feature = "testing"))]
            ConnectionInner::Memory(store) => future::ready(store.execute(cmd)).boxed(),
            #[cfg(feature = "mock")]
            ConnectionInner::Mock(mock_conn) => {
                let result = deadpool_redis::redis::ConnectionLike::req_packed_command(
                    mock_conn,
                    &cmd.get_packed_command(),
                );
                future::ready(result).boxed()
            }
        }
    }

    fn req_packed_commands<'a>(
        &'a mut self,
        cmd: &'a Pipeline,
        offset: usize,
        count: usize,
    ) -> RedisFuture<'a, Vec<Value>> {
        match &mut self.inner {
            ConnectionInner::Tokio(connection) => {
                connection.req_packed_commands(cmd, offset, count)
            }
            ConnectionInner::DryRun => {
                let responses = cmd
                    .cmd_iter()
                    .skip(offset)
                    .take(count)
                    .map(dry_run_cmd_handler)
                    .collect::<Result<_, RedisError>>();
                future::ready(responses).boxed()
            }
            #[cfg(any(test, feature = "testing"))]
            ConnectionInner::Memory(store) => {
                let responses = cmd
                    .cmd_iter()
                    .skip(offset)
                    .take(count)
                    .map(|cmd| store.execute(cmd))
                    .collect::<Result<_, RedisError>>();
                future::ready(responses).boxed()
            }
            #[cfg(feature = "mock")]
            ConnectionInner::Mock(mock_conn) => {
                let result = deadpool_redis::redis::ConnectionLike::req_packed_commands(
                    mock_conn,
                    &cmd.get_packed_pipeline(),
                    offset,
                    count,
                );
                future::ready(result).boxed()
            }
        }
    }

    fn get_db(&self) -> i64 {
        match &self.inner {
            ConnectionInner::Tokio(connection) => connection.get_db(),
            ConnectionInner::DryRun => 0,
            #[cfg(any(test, feature = "testing"))]
            ConnectionInner::Memory(_) => 0,
            #[cfg(feature = "mock")]
            ConnectionInner::Mock(mock_conn) => {
                deadpool_redis::redis::ConnectionLike::get_db(mock_conn)
            }
        }
    }
}

impl Connection {
    pub(crate) fn new(inner: ConnectionInner) -> Self {
        Self { inner }
    }

    /// Checks that the store answers
    #[tracing::instrument(name = "cache:ping", skip(self), err)]
    pub async fn ping(&mut self) -> Result<(), RedisError> {
        let _: () = redis::cmd("PING").query_async(self).await?;
        Ok(())
    }

    /// Replaces the whole hash stored at `key` by `fields`
    ///
    /// The key is deleted first so that fields missing from `fields` do not survive.
    /// An empty `fields` leaves no record at all.
    #[tracing::instrument(name = "cache:replace_hash", skip(self, fields), fields(nb_fields = fields.len()), err)]
    pub async fn replace_hash(
        &mut self,
        key: &str,
        fields: &[(String, String)],
    ) -> Result<(), RedisError> {
        self.del::<_, ()>(key).await?;
        if !fields.is_empty() {
            let _: () = redis::cmd("HMSET")
                .arg(key)
                .arg(fields)
                .query_async(self)
                .await?;
        }
        Ok(())
    }

    /// Sets a scalar value
    #[tracing::instrument(name = "cache:replace_value", skip(self, value), err)]
    pub async fn replace_value(&mut self, key: &str, value: &str) -> Result<(), RedisError> {
        self.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    /// Sets a serializable value as a JSON string
    #[tracing::instrument(name = "cache:json_set", skip(self, value), err)]
    pub async fn json_set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), RedisError> {
        let str_value = serde_json::to_string(value).map_err(|e| {
            RedisError::from((
                ErrorKind::TypeError,
                "value cannot be serialized to JSON",
                format!("type '{}': {e}", std::any::type_name::<T>()),
            ))
        })?;
        self.replace_value(key, &str_value).await
    }

    /// Deletes a key, returns whether it existed
    #[tracing::instrument(name = "cache:delete", skip(self), err)]
    pub async fn delete(&mut self, key: &str) -> Result<bool, RedisError> {
        let removed: i64 = self.del(key).await?;
        Ok(removed > 0)
    }

    #[tracing::instrument(name = "cache:hash_field", skip(self), err)]
    pub async fn hash_field(
        &mut self,
        key: &str,
        field: &str,
    ) -> Result<Option<String>, RedisError> {
        self.hget(key, field).await
    }

    /// Lists every key matching a glob `pattern`, sorted
    ///
    /// Walks the keyspace with `SCAN` instead of `KEYS` so the server is never blocked
    /// on a single huge reply.
    #[tracing::instrument(name = "cache:scan_keys", skip(self), err)]
    pub async fn scan_keys(&mut self, pattern: &str) -> Result<Vec<String>, RedisError> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(self)
                .await?;
            keys.extend(batch);
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        tracing::debug!(nb_keys = keys.len());
        Ok(keys)
    }
}

impl Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.inner {
            ConnectionInner::Tokio(_) => "redis",
            ConnectionInner::DryRun => "dry-run",
            #[cfg(any(test, feature = "testing"))]
            ConnectionInner::Memory(_) => "memory",
            #[cfg(feature = "mock")]
            ConnectionInner::Mock(_) => "mock",
        };
        f.debug_struct("Connection").field("backend", &backend).finish()
    }
}
