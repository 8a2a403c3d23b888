//! # Redis
//!
//! Document store for tasks.
//!
//! - Each task is a JSON document under `task:{id}`
//! - Sorted set `tasks:by_created` indexes ids by creation time (microseconds)
//! - Hash `tasks:seq` maps each id to its insertion number from `INCR tasks:next_seq`;
//!   equal creation times are listed later insertion first
//! - Create and delete touch the document and both indexes in one MULTI/EXEC
//! - Update is read-merge-write; concurrent writers to one id: last one wins
//!
//! Every key can carry a prefix so several stores share one server.
use std::cmp::Reverse;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use shared::{CreateTaskRequest, Task, UpdateTaskRequest};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{new_task, not_found, parse_id, TaskStore};
use crate::error::StoreError;

fn created_score(task: &Task) -> i64 {
    task.created_at.timestamp_micros()
}

#[derive(Clone)]
pub struct RedisTaskStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisTaskStore {
    /// Open a managed connection and make sure the server answers.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        Self::connect_with_prefix(redis_url, "").await
    }

    /// Like [`connect`](Self::connect), with every key prefixed by `prefix`.
    pub async fn connect_with_prefix(redis_url: &str, prefix: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)?;
        let mut connection = ConnectionManager::new(client).await?;

        let pong: String = redis::cmd("PING").query_async(&mut connection).await?;
        debug!(%pong, prefix, "redis reachable");

        Ok(Self {
            connection,
            prefix: prefix.to_string(),
        })
    }

    fn task_key(&self, id: &str) -> String {
        format!("{}task:{id}", self.prefix)
    }

    fn created_index(&self) -> String {
        format!("{}tasks:by_created", self.prefix)
    }

    fn seq_hash(&self) -> String {
        format!("{}tasks:seq", self.prefix)
    }

    fn seq_counter(&self) -> String {
        format!("{}tasks:next_seq", self.prefix)
    }

    async fn load(&self, id: &Uuid) -> Result<Option<Task>, StoreError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(self.task_key(&id.to_string())).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StoreError::from)
    }

    /// Overwrite the document of an existing task. `SET XX` never resurrects
    /// a task deleted since it was read.
    async fn write_existing(&self, task: &Task) -> Result<(), StoreError> {
        let document = serde_json::to_string(task)?;
        let mut conn = self.connection.clone();
        let written: Option<String> = redis::cmd("SET")
            .arg(self.task_key(&task.id.to_string()))
            .arg(document)
            .arg("XX")
            .query_async(&mut conn)
            .await?;

        match written {
            Some(_) => Ok(()),
            None => Err(not_found()),
        }
    }
}

#[async_trait]
impl TaskStore for RedisTaskStore {
    async fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        let mut conn = self.connection.clone();

        let ids: Vec<String> = conn.zrevrange(self.created_index(), 0, -1).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.task_key(id)).collect();
        let documents: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;
        let seqs: Vec<Option<u64>> = redis::cmd("HMGET")
            .arg(self.seq_hash())
            .arg(&ids)
            .query_async(&mut conn)
            .await?;

        let mut tasks = Vec::with_capacity(documents.len());
        for ((id, document), seq) in ids.iter().zip(documents).zip(seqs) {
            match document {
                Some(json) => tasks.push((serde_json::from_str::<Task>(&json)?, seq.unwrap_or(0))),
                // Index entry without a document; a delete raced this read.
                None => warn!(%id, "indexed task has no document"),
            }
        }

        tasks.sort_by_key(|(task, seq)| (Reverse(task.created_at), Reverse(*seq)));
        Ok(tasks.into_iter().map(|(task, _)| task).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Task, StoreError> {
        let id = parse_id(id)?;
        self.load(&id).await?.ok_or_else(not_found)
    }

    async fn create(&self, fields: CreateTaskRequest) -> Result<Task, StoreError> {
        let task = new_task(fields)?;
        let document = serde_json::to_string(&task)?;
        let id = task.id.to_string();

        let mut conn = self.connection.clone();
        let seq: u64 = conn.incr(self.seq_counter(), 1).await?;

        redis::pipe()
            .atomic()
            .set(self.task_key(&id), document)
            .ignore()
            .zadd(self.created_index(), &id, created_score(&task))
            .ignore()
            .hset(self.seq_hash(), &id, seq)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(task)
    }

    async fn update_by_id(&self, id: &str, patch: UpdateTaskRequest) -> Result<Task, StoreError> {
        let id = parse_id(id)?;
        let mut task = self.load(&id).await?.ok_or_else(not_found)?;
        task.apply(patch).map_err(StoreError::Validation)?;

        self.write_existing(&task).await?;
        Ok(task)
    }

    async fn delete_by_id(&self, id: &str) -> Result<Task, StoreError> {
        let id = parse_id(id)?;
        let task = self.load(&id).await?.ok_or_else(not_found)?;
        let member = id.to_string();

        let mut conn = self.connection.clone();
        let (removed,): (u64,) = redis::pipe()
            .atomic()
            .del(self.task_key(&member))
            .zrem(self.created_index(), &member)
            .ignore()
            .hdel(self.seq_hash(), &member)
            .ignore()
            .query_async(&mut conn)
            .await?;

        if removed == 0 {
            return Err(not_found());
        }
        Ok(task)
    }
}
