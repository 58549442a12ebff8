//! SQLite-backed snapshot storage.
//!
//! sqlx is async, the storage port is not. Every [`SqliteStorage`] owns a
//! worker thread with its own current-thread runtime and pool; callers hand
//! it requests over a channel and wait for the reply. Nothing runs on the
//! caller's runtime, so the storage can be opened, used and dropped from
//! plain threads and from inside async tasks alike.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::Context;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tokio::runtime::{Builder, Runtime};

use crate::storage::{SnapshotStorage, StorageError};

type Reply<T> = Sender<anyhow::Result<T>>;

enum Request {
    Read { key: String, reply: Reply<Option<Vec<u8>>> },
    Write { key: String, bytes: Vec<u8>, reply: Reply<()> },
}

/// Durable snapshot storage in a local SQLite file.
///
/// Calls block the calling thread until the worker answers. Inside a
/// multi-threaded runtime that is an ordinary short blocking call; it never
/// re-enters the caller's runtime.
#[derive(Debug)]
pub struct SqliteStorage {
    path: PathBuf,
    requests: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl SqliteStorage {
    /// Open (creating if missing) the database at `path`.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create cart storage directory at {:?}", parent))?;
        }

        let (requests, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker_path = path.clone();
        let worker = thread::Builder::new()
            .name("lavka-cart-sqlite".to_string())
            .spawn(move || {
                let opened = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context("failed to create runtime for SqliteStorage")
                    .and_then(|runtime| {
                        let pool = runtime.block_on(connect(&worker_path))?;
                        Ok((runtime, pool))
                    });

                match opened {
                    Ok((runtime, pool)) => {
                        let _ = ready_tx.send(Ok(()));
                        serve(&runtime, &pool, inbox);
                        runtime.block_on(pool.close());
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                    }
                }
            })
            .context("failed to spawn SQLite worker thread")?;

        ready_rx
            .recv()
            .context("SQLite worker exited before opening the database")??;

        tracing::debug!(path = %path.display(), "opened SQLite cart storage");

        Ok(Self {
            path,
            requests: Some(requests),
            worker: Some(worker),
        })
    }

    /// Open the database at [`default_db_path`].
    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(default_db_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn call<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> Result<T, StorageError> {
        let requests = self.requests.as_ref().ok_or(StorageError::Unavailable)?;
        let (reply, answer) = mpsc::channel();

        requests.send(request(reply)).map_err(|_| StorageError::Unavailable)?;
        answer
            .recv()
            .map_err(|_| StorageError::Unavailable)?
            .map_err(StorageError::backend)
    }
}

impl SnapshotStorage for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.call(|reply| Request::Read {
            key: key.to_string(),
            reply,
        })
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.call(|reply| Request::Write {
            key: key.to_string(),
            bytes: bytes.to_vec(),
            reply,
        })
    }
}

impl Drop for SqliteStorage {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop; it closes the pool itself.
        drop(self.requests.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(path = %self.path.display(), "SQLite worker panicked");
            }
        }
    }
}

async fn connect(path: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open SQLite cart storage at {:?}", path))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            key      TEXT NOT NULL PRIMARY KEY,
            data     BLOB NOT NULL,
            saved_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .context("failed to create snapshots table")?;

    Ok(pool)
}

fn serve(runtime: &Runtime, pool: &SqlitePool, inbox: Receiver<Request>) {
    for request in inbox {
        match request {
            Request::Read { key, reply } => {
                let _ = reply.send(runtime.block_on(read_snapshot(pool, &key)));
            }
            Request::Write { key, bytes, reply } => {
                let _ = reply.send(runtime.block_on(write_snapshot(pool, &key, &bytes)));
            }
        }
    }
}

async fn read_snapshot(pool: &SqlitePool, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let row = sqlx::query(
        r#"
        SELECT data
        FROM snapshots
        WHERE key = ?1
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await
    .context("failed to fetch cart snapshot")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let data: Vec<u8> = row.try_get("data")?;
    Ok(Some(data))
}

async fn write_snapshot(pool: &SqlitePool, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO snapshots (key, data, saved_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key)
        DO UPDATE SET
            data = excluded.data,
            saved_at = excluded.saved_at
        "#,
    )
    .bind(key)
    .bind(bytes)
    .bind(&now)
    .execute(pool)
    .await
    .context("failed to upsert cart snapshot")?;

    Ok(())
}

/// Resolve the path to the cart database:
/// `{app_data_dir}/lavka/cart.db`.
pub fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    Ok(base.join("lavka").join("cart.db"))
}
