//! Media chunk persistence

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::utils::error::{SessionError, SessionResult};

/// Identifier tying chunks, output files, and metadata to one recording
pub type SessionId = Uuid;

/// Durable destination for recorded media chunks.
///
/// `open` is called once when a recording starts, `write` per chunk in
/// arrival order, and `close` exactly once when the recording stops.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn open(&self, session: SessionId) -> SessionResult<()>;

    async fn write(&self, session: SessionId, chunk: &[u8]) -> SessionResult<()>;

    async fn close(&self, session: SessionId) -> SessionResult<()>;
}

/// Metadata written next to each finished session file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub session_id: SessionId,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub bytes_written: u64,
}

struct OpenFile {
    file: tokio::fs::File,
    opened_at: DateTime<Utc>,
    bytes_written: u64,
}

/// File-backed sink: one `{session_id}.mp4` per session under a target
/// directory, plus a `{session_id}.json` metadata document on close.
pub struct FileChunkSink {
    dir: PathBuf,
    open_files: Mutex<HashMap<SessionId, OpenFile>>,
}

impl FileChunkSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open_files: Mutex::new(HashMap::new()),
        }
    }

    fn media_path(&self, session: SessionId) -> PathBuf {
        self.dir.join(format!("{session}.mp4"))
    }

    fn metadata_path(&self, session: SessionId) -> PathBuf {
        self.dir.join(format!("{session}.json"))
    }
}

#[async_trait]
impl ChunkSink for FileChunkSink {
    async fn open(&self, session: SessionId) -> SessionResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.media_path(session);
        tracing::info!(%session, path = %path.display(), "opening session file");

        let file = tokio::fs::File::create(&path).await?;
        self.open_files.lock().await.insert(
            session,
            OpenFile {
                file,
                opened_at: Utc::now(),
                bytes_written: 0,
            },
        );
        Ok(())
    }

    async fn write(&self, session: SessionId, chunk: &[u8]) -> SessionResult<()> {
        let mut open_files = self.open_files.lock().await;
        let open = open_files.get_mut(&session).ok_or_else(|| {
            SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no open file for session {session}"),
            ))
        })?;
        open.file.write_all(chunk).await?;
        open.bytes_written += chunk.len() as u64;
        Ok(())
    }

    async fn close(&self, session: SessionId) -> SessionResult<()> {
        let Some(mut open) = self.open_files.lock().await.remove(&session) else {
            tracing::warn!(%session, "close for a session that was never opened");
            return Ok(());
        };
        open.file.flush().await?;

        let metadata = SessionMetadata {
            session_id: session,
            opened_at: open.opened_at,
            closed_at: Utc::now(),
            bytes_written: open.bytes_written,
        };
        let json = serde_json::to_vec_pretty(&metadata)?;
        tokio::fs::write(self.metadata_path(session), json).await?;

        tracing::info!(%session, bytes = open.bytes_written, "session file closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_chunks_append_in_order() {
        let dir = tempdir().unwrap();
        let sink = FileChunkSink::new(dir.path());
        let session = Uuid::new_v4();

        sink.open(session).await.unwrap();
        sink.write(session, b"abc").await.unwrap();
        sink.write(session, b"def").await.unwrap();
        sink.close(session).await.unwrap();

        let media = tokio::fs::read(dir.path().join(format!("{session}.mp4")))
            .await
            .unwrap();
        assert_eq!(media, b"abcdef");
    }

    #[tokio::test]
    async fn test_metadata_written_on_close() {
        let dir = tempdir().unwrap();
        let sink = FileChunkSink::new(dir.path());
        let session = Uuid::new_v4();

        sink.open(session).await.unwrap();
        sink.write(session, &[0u8; 16]).await.unwrap();
        sink.close(session).await.unwrap();

        let json = tokio::fs::read(dir.path().join(format!("{session}.json")))
            .await
            .unwrap();
        let metadata: SessionMetadata = serde_json::from_slice(&json).unwrap();
        assert_eq!(metadata.session_id, session);
        assert_eq!(metadata.bytes_written, 16);
        assert!(metadata.closed_at >= metadata.opened_at);
    }

    #[tokio::test]
    async fn test_write_without_open_is_an_error() {
        let dir = tempdir().unwrap();
        let sink = FileChunkSink::new(dir.path());

        let err = sink.write(Uuid::new_v4(), b"x").await.unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
