//! # Redis
//!
//! Shared match cache for multi-process deployments.
//!
//! Values are JSON strings written with `SET .. EX`, so Redis owns expiry. Bulk invalidation
//! walks the keyspace with `SCAN MATCH` rather than `KEYS` to avoid blocking the server on
//! large catalogs. Every command runs with the configured read/write timeout; a slow or
//! unreachable server surfaces as a `CacheError`, which the match cache treats as a miss.
//!
//! Connections are checked out of a small idle pool, so concurrent callers do not queue on
//! one socket. A connection whose command fails is discarded and the next checkout dials a
//! fresh one from the client, which recovers the cache after a network blip.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use redis::{Client, Commands, Connection, ErrorKind, RedisError};
use tracing::debug;

use super::store::{CacheError, CacheStore};

/// Idle connections kept for reuse; extra connections close after use.
const MAX_IDLE_CONNECTIONS: usize = 8;

impl From<RedisError> for CacheError {
    fn from(err: RedisError) -> Self {
        if err.is_timeout() {
            CacheError::Timeout
        } else if err.kind() == ErrorKind::IoError {
            CacheError::Unavailable(format!("connection lost: {err}"))
        } else {
            CacheError::Unavailable(err.to_string())
        }
    }
}

pub struct RedisCacheStore {
    client: Client,
    timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl RedisCacheStore {
    /// Opens the client and dials one connection up front so an unreachable server is
    /// reported at startup.
    pub fn connect(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let store = Self {
            client,
            timeout,
            idle: Mutex::new(Vec::new()),
        };
        let connection = store.dial()?;
        store.check_in(connection);
        Ok(store)
    }

    fn dial(&self) -> Result<Connection, RedisError> {
        let connection = self.client.get_connection_with_timeout(self.timeout)?;
        connection.set_read_timeout(Some(self.timeout))?;
        connection.set_write_timeout(Some(self.timeout))?;
        Ok(connection)
    }

    fn idle(&self) -> Result<MutexGuard<'_, Vec<Connection>>, CacheError> {
        self.idle
            .lock()
            .map_err(|_| CacheError::Unavailable("redis connection pool poisoned".to_string()))
    }

    fn check_out(&self) -> Result<Connection, CacheError> {
        let reused = self.idle()?.pop();
        match reused {
            Some(connection) => Ok(connection),
            None => self.dial().map_err(CacheError::from),
        }
    }

    fn check_in(&self, connection: Connection) {
        if let Ok(mut idle) = self.idle() {
            if idle.len() < MAX_IDLE_CONNECTIONS {
                idle.push(connection);
            }
        }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, RedisError>,
    ) -> Result<T, CacheError> {
        let mut connection = self.check_out()?;
        match op(&mut connection) {
            Ok(value) => {
                self.check_in(connection);
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "discarding redis connection after failed command");
                Err(CacheError::from(err))
            }
        }
    }

    fn scan_keys(connection: &mut Connection, pattern: &str) -> Result<Vec<String>, RedisError> {
        let keys: Vec<String> = connection.scan_match::<_, String>(pattern)?.collect();
        Ok(keys)
    }
}

impl CacheStore for RedisCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.with_connection(|connection| connection.get::<_, Option<String>>(key))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let seconds = ttl.as_secs().max(1);
        self.with_connection(|connection| connection.set_ex::<_, _, ()>(key, value, seconds))
    }

    fn delete_matching(&self, pattern: &str) -> Result<usize, CacheError> {
        self.with_connection(|connection| {
            let keys = Self::scan_keys(connection, pattern)?;
            if keys.is_empty() {
                return Ok(0);
            }
            connection.del::<_, usize>(keys)
        })
    }

    fn count_matching(&self, pattern: &str) -> Result<usize, CacheError> {
        self.with_connection(|connection| Ok(Self::scan_keys(connection, pattern)?.len()))
    }
}
