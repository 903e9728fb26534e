//! Chunk relay interface
//!
//! While a session is recording, encoded media chunks are pushed to a
//! message-oriented sink keyed by session id. The sink persists bytes as-is;
//! it never interprets chunk contents.

pub mod sink;

pub use sink::{ChunkSink, FileChunkSink, SessionId};
