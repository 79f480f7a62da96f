//! Redis Streams-based transport for submitted surge jobs.

use chrono::{DateTime, Utc};
use redis::{aio::MultiplexedConnection, streams::*, AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use surge_common::track::SurgeRequest;
use surge_common::{SurgeError, SurgeResult};

const STREAM_KEY: &str = "surge:jobs";
const CONSUMER_GROUP: &str = "surge-workers";

/// Redis Streams job queue with a single consumer group.
#[derive(Clone)]
pub struct JobQueue {
    conn: MultiplexedConnection,
}

/// A job as carried on the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurgeJob {
    pub id: Uuid,
    pub request: SurgeRequest,
    pub enqueued_at: DateTime<Utc>,
}

impl SurgeJob {
    pub fn new(id: Uuid, request: SurgeRequest) -> Self {
        Self {
            id,
            request,
            enqueued_at: Utc::now(),
        }
    }
}

/// A job read from the stream together with the entry id needed to ack it.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub entry_id: String,
    pub job: SurgeJob,
}

impl JobQueue {
    /// Connect to Redis and make sure the stream and consumer group exist.
    pub async fn connect(redis_url: &str) -> SurgeResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| SurgeError::Queue(format!("Redis connection failed: {}", e)))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SurgeError::Queue(format!("Redis connection failed: {}", e)))?;

        // BUSYGROUP on restart is expected
        let _: Result<(), _> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(STREAM_KEY)
            .arg(CONSUMER_GROUP)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        Ok(Self { conn })
    }

    pub async fn enqueue(&mut self, job: &SurgeJob) -> SurgeResult<String> {
        let job_json = serde_json::to_string(job)
            .map_err(|e| SurgeError::Queue(format!("Serialization failed: {}", e)))?;

        let entry_id: String = redis::cmd("XADD")
            .arg(STREAM_KEY)
            .arg("*")
            .arg("job_id")
            .arg(job.id.to_string())
            .arg("data")
            .arg(&job_json)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| SurgeError::Queue(format!("Enqueue failed: {}", e)))?;

        Ok(entry_id)
    }

    /// Block up to `block_ms` for the next unclaimed job.
    pub async fn claim_next(
        &mut self,
        consumer_name: &str,
        block_ms: usize,
    ) -> SurgeResult<Option<ClaimedJob>> {
        let opts = StreamReadOptions::default()
            .group(CONSUMER_GROUP, consumer_name)
            .count(1)
            .block(block_ms);

        let result: StreamReadReply = self
            .conn
            .xread_options(&[STREAM_KEY], &[">"], &opts)
            .await
            .map_err(|e| SurgeError::Queue(format!("Read failed: {}", e)))?;

        for stream_key in result.keys {
            for entry in stream_key.ids {
                if let Some(data) = entry.map.get("data") {
                    let bytes: Vec<u8> = redis::from_redis_value(data)
                        .map_err(|e| SurgeError::Queue(format!("Parse failed: {}", e)))?;
                    let job = decode_job(&bytes)?;
                    return Ok(Some(ClaimedJob {
                        entry_id: entry.id,
                        job,
                    }));
                }
            }
        }

        Ok(None)
    }

    /// Acknowledge a processed entry so it leaves the pending list.
    pub async fn ack(&mut self, entry_id: &str) -> SurgeResult<()> {
        let _: i64 = self
            .conn
            .xack(STREAM_KEY, CONSUMER_GROUP, &[entry_id])
            .await
            .map_err(|e| SurgeError::Queue(format!("Ack failed: {}", e)))?;
        Ok(())
    }

    /// Get queue depth (entries on the stream).
    pub async fn queue_depth(&mut self) -> SurgeResult<u64> {
        let info: StreamInfoStreamReply = self
            .conn
            .xinfo_stream(STREAM_KEY)
            .await
            .map_err(|e| SurgeError::Queue(format!("XINFO failed: {}", e)))?;

        Ok(info.length as u64)
    }
}

fn decode_job(bytes: &[u8]) -> SurgeResult<SurgeJob> {
    serde_json::from_slice(bytes)
        .map_err(|e| SurgeError::Queue(format!("Deserialize failed: {}", e)))
}
