use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::Result;

/// Layout and counts announced by the first chunk of a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Field names making up one node record, in order.
    pub node_fields: Vec<String>,
    /// Field names making up one edge record, in order.
    pub edge_fields: Vec<String>,
    /// Total number of node records the stream will carry.
    pub node_count: u32,
    /// Total number of edge records the stream will carry.
    pub edge_count: u32,
    /// Offset of the root node inside the flat node array, if not zero.
    pub root_index: Option<u32>,
}

impl SnapshotHeader {
    /// Header using the standard V8 node and edge field layouts.
    pub fn v8(node_count: u32, edge_count: u32) -> Self {
        Self {
            node_fields: ["type", "name", "id", "self_size", "edge_count", "trace_node_id"]
                .into_iter()
                .map(String::from)
                .collect(),
            edge_fields: ["type", "name_or_index", "to_node"]
                .into_iter()
                .map(String::from)
                .collect(),
            node_count,
            edge_count,
            root_index: None,
        }
    }
}

/// One unit of data produced by a snapshot reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotChunk {
    /// Snapshot metadata; must be the first chunk.
    Header(SnapshotHeader),
    /// Flat node records (length is a multiple of the node record width).
    Nodes(Vec<u32>),
    /// Flat edge records (length is a multiple of the edge record width).
    Edges(Vec<u32>),
    /// Next slice of the string table.
    Strings(Vec<String>),
    /// A chunk kind the reader could not classify.
    Unknown(String),
}

impl SnapshotChunk {
    pub(crate) fn kind(&self) -> &str {
        match self {
            SnapshotChunk::Header(_) => "header",
            SnapshotChunk::Nodes(_) => "nodes",
            SnapshotChunk::Edges(_) => "edges",
            SnapshotChunk::Strings(_) => "strings",
            SnapshotChunk::Unknown(kind) => kind,
        }
    }
}

/// Ordered, asynchronous producer of snapshot chunks.
///
/// `Ok(None)` marks the end of the stream.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    /// Awaits the next chunk.
    async fn next_chunk(&mut self) -> Result<Option<SnapshotChunk>>;
}

impl<S> SnapshotSource for S
where
    S: Stream<Item = Result<SnapshotChunk>> + Unpin,
{
    async fn next_chunk(&mut self) -> Result<Option<SnapshotChunk>> {
        self.next().await.transpose()
    }
}

/// Wraps an in-memory chunk list as a [`SnapshotSource`].
pub fn from_chunks(
    chunks: Vec<SnapshotChunk>,
) -> impl SnapshotSource + Stream<Item = Result<SnapshotChunk>> + Unpin {
    futures::stream::iter(chunks.into_iter().map(Ok))
}

/// Receiving half of [`chunk_channel`].
///
/// Yields chunks in send order and ends once every sender is dropped.
#[derive(Debug)]
pub struct ChunkReceiver {
    rx: mpsc::Receiver<Result<SnapshotChunk>>,
}

impl Stream for ChunkReceiver {
    type Item = Result<SnapshotChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Bounded channel for feeding a snapshot from another task.
///
/// Producers send `Err` to abort the build with their own error.
pub fn chunk_channel(capacity: usize) -> (mpsc::Sender<Result<SnapshotChunk>>, ChunkReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (tx, ChunkReceiver { rx })
}
