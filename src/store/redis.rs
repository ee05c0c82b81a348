// Redis counter store
//
// Records are stored as "attempts:expires_at" strings under a rate_limit:
// namespace. The compare-and-swap runs as a Lua script so the read, the
// comparison, and the write execute as one atomic step on the server.
// Keys carry EXPIREAT, so Redis retires dead windows on its own and sweep
// has nothing to do.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Script};
use tracing::warn;

use super::{CounterStore, RateWindowRecord, StoreError};

const CAS_SCRIPT: &str = r#"
    local current = redis.call('GET', KEYS[1])
    if current == false then
        current = ''
    end
    if current ~= ARGV[1] then
        return 0
    end
    redis.call('SET', KEYS[1], ARGV[2])
    redis.call('EXPIREAT', KEYS[1], tonumber(ARGV[3]))
    return 1
"#;

/// Distributed counter store backed by Redis
pub struct RedisCounterStore {
    connection: ConnectionManager,
    cas_script: Script,
}

impl RedisCounterStore {
    /// Connect with automatic reconnection handling
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;

        Ok(Self {
            connection,
            cas_script: Script::new(CAS_SCRIPT),
        })
    }

    fn namespaced(key: &str) -> String {
        format!("rate_limit:{}", key)
    }

    fn encode(record: &RateWindowRecord) -> String {
        format!("{}:{}", record.attempts, record.expires_at)
    }

    fn decode(raw: &str) -> Option<RateWindowRecord> {
        let (attempts, expires_at) = raw.split_once(':')?;
        Some(RateWindowRecord {
            attempts: attempts.parse().ok()?,
            expires_at: expires_at.parse().ok()?,
        })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn load(&self, key: &str) -> Result<Option<RateWindowRecord>, StoreError> {
        let mut connection = self.connection.clone();
        let namespaced = Self::namespaced(key);
        let raw: Option<String> = connection.get(&namespaced).await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match Self::decode(&raw) {
            Some(record) => Ok(Some(record)),
            None => {
                // an unreadable record would reject every swap against its
                // key; drop it so the next swap rebuilds from absent
                warn!(key = %namespaced, "dropping undecodable rate limit record");
                let _: () = connection.del(&namespaced).await?;
                Ok(None)
            },
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        current: Option<RateWindowRecord>,
        next: RateWindowRecord,
    ) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let expected = current
            .as_ref()
            .map(Self::encode)
            .unwrap_or_default();

        // EXPIREAT one second past the window close so a record stays
        // readable through its final boundary second
        let applied: i64 = self
            .cas_script
            .key(Self::namespaced(key))
            .arg(expected)
            .arg(Self::encode(&next))
            .arg(next.expires_at + 1)
            .invoke_async(&mut connection)
            .await?;

        Ok(applied == 1)
    }

    async fn sweep(&self, _now: u64) -> Result<usize, StoreError> {
        // Redis expires keys itself via EXPIREAT
        Ok(0)
    }
}
