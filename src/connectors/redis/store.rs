//! Storage seam for chat memory

use super::types::{timestamps_key, RedisConfig, SYSTEM_MESSAGES_KEY};
use crate::error::{Error, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Operations chat memory needs from a key-value store
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Replace the system message of a session
    async fn set_system_message(&self, session_id: &str, record: String) -> Result<()>;

    /// System message of a session, if any
    async fn system_message(&self, session_id: &str) -> Result<Option<String>>;

    /// Add a message scored by its timestamp
    async fn add_message(&self, session_id: &str, timestamp: i64, record: String) -> Result<()>;

    /// Up to `count` messages, newest first
    async fn latest_messages(&self, session_id: &str, count: usize) -> Result<Vec<String>>;
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Open a managed connection to the configured server
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(connection_url(config)?.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Round-trip a PING
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// `redis://[user:password@]host:port/0` with credentials escaped
pub fn connection_url(config: &RedisConfig) -> Result<url::Url> {
    if config.host.is_empty() {
        return Err(Error::missing_field("host"));
    }
    let mut url = url::Url::parse(&format!("redis://{}:{}/0", config.host, config.port))?;
    if let Some(username) = config.username.as_deref().filter(|u| !u.is_empty()) {
        url.set_username(username)
            .map_err(|()| Error::config("invalid redis username"))?;
    }
    if let Some(password) = config.password.as_deref().filter(|p| !p.is_empty()) {
        url.set_password(Some(password))
            .map_err(|()| Error::config("invalid redis password"))?;
    }
    Ok(url)
}

#[async_trait]
impl ChatStore for RedisStore {
    async fn set_system_message(&self, session_id: &str, record: String) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(SYSTEM_MESSAGES_KEY, session_id, record)
            .await?;
        Ok(())
    }

    async fn system_message(&self, session_id: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hget(SYSTEM_MESSAGES_KEY, session_id).await?)
    }

    async fn add_message(&self, session_id: &str, timestamp: i64, record: String) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(timestamps_key(session_id), record, timestamp)
            .await?;
        Ok(())
    }

    async fn latest_messages(&self, session_id: &str, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        Ok(conn
            .zrevrange(timestamps_key(session_id), 0, range_stop(count))
            .await?)
    }
}

/// Inclusive ZREVRANGE stop index for the newest `count` members
pub(crate) fn range_stop(count: usize) -> isize {
    isize::try_from(count.saturating_sub(1)).unwrap_or(isize::MAX)
}
