//! Redis adapter for the hot tier
//!
//! Connections are pooled with `r2d2`; every pooled connection carries the
//! call timeout as its socket read/write timeout, so a stalled server
//! surfaces as [`Error::Timeout`] instead of blocking the caller.

use std::time::Duration;

use r2d2::{CustomizeConnection, Pool, PooledConnection};
use redis::{Client, Cmd, Connection, RedisError};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::kv::{EvictionSettings, KeyValueStore};

const BACKEND: &str = "redis";

/// Connection settings for [`RedisStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisOptions {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Logical database index selected on connect
    pub db: u32,
    /// Bound on connecting and on every command
    pub timeout: Duration,
    /// Maximum pooled connections
    pub pool_size: u32,
}

impl RedisOptions {
    /// Default bound on a single call
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
    /// Default pool size
    pub const DEFAULT_POOL_SIZE: u32 = 16;

    /// Options for `host:port/db` with default timeout and pool size
    pub fn new(host: impl Into<String>, port: u16, db: u32) -> Self {
        Self {
            host: host.into(),
            port,
            db,
            timeout: Self::DEFAULT_TIMEOUT,
            pool_size: Self::DEFAULT_POOL_SIZE,
        }
    }

    /// Connection URL understood by the redis client
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

#[derive(Debug)]
struct CallTimeout(Duration);

impl CustomizeConnection<Connection, RedisError> for CallTimeout {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), RedisError> {
        conn.set_read_timeout(Some(self.0))?;
        conn.set_write_timeout(Some(self.0))
    }
}

/// Key-value store backed by a Redis server
pub struct RedisStore {
    pool: Pool<Client>,
}

impl RedisStore {
    /// Open a connection pool to the server described by `options`
    pub fn connect(options: &RedisOptions) -> Result<Self> {
        let client = Client::open(options.url()).map_err(classify)?;
        let pool = Pool::builder()
            .max_size(options.pool_size)
            .connection_timeout(options.timeout)
            .connection_customizer(Box::new(CallTimeout(options.timeout)))
            .build(client)
            .map_err(pool_error)?;

        info!(
            host = %options.host,
            port = options.port,
            db = options.db,
            "connected to redis"
        );
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<Client>> {
        self.pool.get().map_err(pool_error)
    }
}

impl KeyValueStore for RedisStore {
    fn configure(&self, settings: &EvictionSettings) -> Result<()> {
        let mut conn = self.conn()?;
        for cmd in config_commands(settings) {
            cmd.query::<()>(&mut *conn).map_err(classify)?;
        }
        info!(
            maxmemory = settings.capacity_bytes,
            policy = %settings.policy,
            samples = settings.samples,
            "configured redis eviction"
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        redis::cmd("GET").arg(key).query(&mut *conn).map_err(classify)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn()?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query::<()>(&mut *conn)
            .map_err(classify)
    }

    fn delete(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn()?;
        redis::cmd("DEL").arg(key).query(&mut *conn).map_err(classify)
    }

    fn flush(&self) -> Result<()> {
        let mut conn = self.conn()?;
        redis::cmd("FLUSHDB").query::<()>(&mut *conn).map_err(classify)?;
        debug!("flushed redis database");
        Ok(())
    }
}

/// `CONFIG SET` commands forwarding capacity and eviction policy
fn config_commands(settings: &EvictionSettings) -> [Cmd; 3] {
    let mut maxmemory = redis::cmd("CONFIG");
    maxmemory.arg("SET").arg("maxmemory").arg(settings.capacity_bytes);

    let mut policy = redis::cmd("CONFIG");
    policy.arg("SET").arg("maxmemory-policy").arg(settings.policy.as_str());

    let mut samples = redis::cmd("CONFIG");
    samples.arg("SET").arg("maxmemory-samples").arg(settings.samples);

    [maxmemory, policy, samples]
}

fn classify(err: RedisError) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            backend: BACKEND,
            reason: err.to_string(),
        }
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        Error::Unavailable {
            backend: BACKEND,
            reason: err.to_string(),
        }
    } else {
        Error::Rejected {
            backend: BACKEND,
            reason: err.to_string(),
        }
    }
}

fn pool_error(err: r2d2::Error) -> Error {
    Error::Unavailable {
        backend: BACKEND,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use crate::kv::EvictionPolicy;

    fn packed(cmd: &Cmd) -> String {
        String::from_utf8_lossy(&cmd.get_packed_command()).into_owned()
    }

    #[test]
    fn test_url() {
        let options = RedisOptions::new("myredis", 6379, 15);
        assert_eq!(options.url(), "redis://myredis:6379/15");
        assert_eq!(options.timeout, RedisOptions::DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_config_commands() {
        let cmds = config_commands(&EvictionSettings::lru(100 * 1024 * 1024));

        assert!(packed(&cmds[0]).contains("maxmemory\r\n$9\r\n104857600"));
        assert!(packed(&cmds[1]).contains("allkeys-lru"));
        assert!(packed(&cmds[2]).contains("maxmemory-samples\r\n$1\r\n5"));
    }

    #[test]
    fn test_config_commands_forward_policy() {
        let settings = EvictionSettings {
            policy: EvictionPolicy::NoEviction,
            ..EvictionSettings::lru(1024)
        };
        let cmds = config_commands(&settings);

        assert!(packed(&cmds[1]).contains("maxmemory-policy\r\n$10\r\nnoeviction"));
    }

    #[test]
    fn test_classify_timeout() {
        let err = RedisError::from(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        assert!(matches!(classify(err), Error::Timeout { backend: "redis", .. }));
    }

    #[test]
    fn test_classify_unavailable() {
        let err = RedisError::from(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        let mapped = classify(err);
        assert!(matches!(mapped, Error::Unavailable { .. }));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn test_classify_response_error() {
        let err = RedisError::from((redis::ErrorKind::ResponseError, "OOM command not allowed"));
        let mapped = classify(err);
        assert!(matches!(mapped, Error::Rejected { .. }));
        assert!(!mapped.is_retryable());
    }
}
