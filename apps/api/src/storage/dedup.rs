use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::storage::EventLedger;

const KEY_PREFIX: &str = "talent:upload-event:";

/// Redis ledger using `SET key 1 NX EX ttl`. Entries expire after `ttl_secs`.
#[derive(Clone)]
pub struct RedisEventLedger {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisEventLedger {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

impl RedisEventLedger {
    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")
    }
}

#[async_trait]
impl EventLedger for RedisEventLedger {
    async fn first_seen(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(format!("{KEY_PREFIX}{key}"))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await
            .context("Redis SET NX failed")?;

        Ok(reply.is_some())
    }

    async fn release(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("DEL")
            .arg(format!("{KEY_PREFIX}{key}"))
            .query_async(&mut conn)
            .await
            .context("Redis DEL failed")?;
        Ok(())
    }
}
