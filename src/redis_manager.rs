//! Redis Manager - Centralized Redis connection and operations
//!
//! This module handles all Redis-related operations including:
//! - Job queue operations (BLPOP)
//! - Report storage and publishing

use std::time::Duration;

use anyhow::{Context, Result};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::jobs::{ExecutionJob, ExecutionReport};

/// Redis key constants
pub mod keys {
    /// Execution job queue key
    pub const EXEC_QUEUE: &str = "exec:queue";

    /// Execution report key prefix (for polling)
    pub const EXEC_RESULT_PREFIX: &str = "exec:result:";

    /// Execution report channel (for pub/sub)
    pub const EXEC_RESULT_CHANNEL: &str = "exec:results";
}

const RESULT_EXPIRY_SECS: u64 = 3600; // 1 hour
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Centralized Redis manager for all Redis operations
pub struct RedisManager {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisManager {
    async fn with_url(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = get_connection_with_retry(&client).await?;
        info!("Connected to Redis at {}", redis_url);

        Ok(Self { client, conn })
    }

    /// Create a new RedisManager using the REDIS_URL environment variable.
    /// Defaults to "redis://localhost:6379" if not set.
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        Self::with_url(&url).await
    }

    /// Block and wait for the next job from the queue.
    ///
    /// Malformed payloads are logged and skipped. Reconnects on connection
    /// failure.
    pub async fn pop_job(&mut self) -> Result<ExecutionJob> {
        loop {
            let result: Option<(String, String)> =
                match self.conn.blpop(keys::EXEC_QUEUE, 0.0).await {
                    Ok(res) => res,
                    Err(e) => {
                        warn!("Redis BLPOP failed: {}. Reconnecting...", e);
                        self.reconnect().await?;
                        continue;
                    }
                };

            if let Some((_, job_data)) = result {
                match parse_job(&job_data) {
                    Ok(job) => return Ok(job),
                    Err(e) => {
                        warn!("Failed to parse job data: {}. Data: {}", e, job_data);
                        continue;
                    }
                }
            }
        }
    }

    /// Store an execution report.
    ///
    /// The report is stored with a 1-hour expiration and also published
    /// to a channel for real-time subscribers.
    pub async fn store_report(&mut self, report: &ExecutionReport) -> Result<()> {
        let key = result_key(&report.request_id);
        let json = serde_json::to_string(report)?;

        if let Err(e) = self
            .conn
            .set_ex::<_, _, ()>(&key, &json, RESULT_EXPIRY_SECS)
            .await
        {
            warn!("Failed to store report: {}. Reconnecting...", e);
            self.reconnect().await?;
            self.conn
                .set_ex::<_, _, ()>(&key, &json, RESULT_EXPIRY_SECS)
                .await?;
        }

        // Publish to channel (ignore errors as there may be no subscribers)
        let _ = self
            .conn
            .publish::<_, _, ()>(keys::EXEC_RESULT_CHANNEL, &json)
            .await;

        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.conn = get_connection_with_retry(&self.client).await?;
        Ok(())
    }
}

fn parse_job(data: &str) -> serde_json::Result<ExecutionJob> {
    serde_json::from_str(data)
}

fn result_key(request_id: &str) -> String {
    format!("{}{}", keys::EXEC_RESULT_PREFIX, request_id)
}

/// Get a Redis connection with retry logic
async fn get_connection_with_retry(client: &redis::Client) -> Result<MultiplexedConnection> {
    loop {
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Retrying in {} seconds...",
                    e,
                    RECONNECT_DELAY.as_secs()
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_key() {
        assert_eq!(result_key("42"), "exec:result:42");
    }

    #[test]
    fn test_parse_job_rejects_missing_code() {
        assert!(parse_job(r#"{"request_id":"1","language":"c"}"#).is_err());
    }
}
