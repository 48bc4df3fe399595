use std::sync::Arc;

use leakscope::heap::{
    chunk_channel, from_chunks, HeapGraph, SnapshotBuilder, SnapshotChunk, SnapshotHeader,
};
use leakscope::types::{
    EdgeIndex, IndexOrName, NodeIndex, SnapshotEdgeType as E, SnapshotNodeType as N,
};
use leakscope::{LeakError, Result, StringMap};

fn sample() -> SnapshotBuilder {
    let mut b = SnapshotBuilder::new().records_per_chunk(2);
    let root = b.node(N::Synthetic, "", 0);
    let window = b.node(N::Object, "Window", 40);
    let arr = b.node(N::Array, "", 24);
    let s = b.node(N::String, "hello", 18);
    b.named(root, E::Shortcut, "window", window);
    b.property(window, "arr", arr);
    b.property(window, "greeting", s);
    b.edge(arr, E::Element, 0, s);
    b.edge(arr, E::Element, 1, window);
    b
}

#[tokio::test]
async fn chunks_can_be_fed_from_another_task() -> Result<()> {
    let chunks = sample().chunks();
    let (tx, mut rx) = chunk_channel(2);
    let producer = tokio::spawn(async move {
        for chunk in chunks {
            if tx.send(Ok(chunk)).await.is_err() {
                break;
            }
        }
    });
    let graph = HeapGraph::build(&mut rx, Arc::new(StringMap::new())).await?;
    producer.await.expect("producer task");

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 5);
    let window = graph.node(NodeIndex(1));
    assert_eq!(window.name(), "Window");
    assert_eq!(window.self_size(), 40);
    let names: Vec<_> = window.edges().filter_map(|e| e.name()).collect();
    assert_eq!(names, vec!["arr", "greeting"]);
    let arr = window.child(0)?.to();
    assert_eq!(arr.child(1)?.index_or_name()?, IndexOrName::Index(1));
    assert_eq!(arr.child(1)?.to(), window);
    assert!(matches!(arr.child(2), Err(LeakError::OutOfRange { index: 2, len: 2 })));
    assert_eq!(graph.first_edge_indexes(), &[0, 1, 3, 5, 5]);
    Ok(())
}

#[tokio::test]
async fn producer_errors_abort_the_build() {
    let mut chunks = sample().chunks().into_iter();
    let (tx, mut rx) = chunk_channel(8);
    tokio::spawn(async move {
        if let Some(header) = chunks.next() {
            let _ = tx.send(Ok(header)).await;
        }
        let _ = tx
            .send(Err(LeakError::Source("debugger detached".into())))
            .await;
    });
    let strings = Arc::new(StringMap::new());
    let err = match HeapGraph::build(&mut rx, Arc::clone(&strings)).await {
        Ok(_) => panic!("build should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, LeakError::Source(ref msg) if msg == "debugger detached"));
    assert!(!err.is_malformed());
    assert!(strings.is_empty());
}

#[tokio::test]
async fn graphs_share_one_string_map() -> Result<()> {
    let strings = Arc::new(StringMap::new());
    let first = sample().build(Arc::clone(&strings)).await?;
    let second = sample().strings_first(true).build(Arc::clone(&strings)).await?;
    let a = first.edge(EdgeIndex(1));
    let b = second.edge(EdgeIndex(1));
    assert_eq!(a.name(), Some("arr"));
    assert_eq!(a.name_id(), b.name_id());
    assert_eq!(first.node(NodeIndex(1)).name_id(), second.node(NodeIndex(1)).name_id());
    assert!(Arc::ptr_eq(first.strings(), second.strings()));
    Ok(())
}

async fn build(chunks: Vec<SnapshotChunk>) -> Result<HeapGraph> {
    HeapGraph::build(&mut from_chunks(chunks), Arc::new(StringMap::new())).await
}

fn replace<F>(mut chunks: Vec<SnapshotChunk>, f: F) -> Vec<SnapshotChunk>
where
    F: Fn(&mut SnapshotChunk),
{
    chunks.iter_mut().for_each(f);
    chunks
}

#[tokio::test]
async fn malformed_streams_are_rejected() {
    let good = sample().chunks();
    let header = |f: fn(&mut SnapshotHeader)| {
        replace(good.clone(), move |c| {
            if let SnapshotChunk::Header(h) = c {
                f(h);
            }
        })
    };

    let cases: Vec<(&str, Vec<SnapshotChunk>)> = vec![
        ("empty", Vec::new()),
        ("records before header", good[1..].to_vec()),
        ("duplicate header", {
            let mut c = good.clone();
            c.push(good[0].clone());
            c
        }),
        ("unknown chunk", {
            let mut c = good.clone();
            c.insert(1, SnapshotChunk::Unknown("samples".into()));
            c
        }),
        ("no nodes", header(|h| {
            h.node_count = 0;
            h.edge_count = 0;
        })),
        ("root offset misaligned", header(|h| h.root_index = Some(7))),
        ("root offset past end", header(|h| h.root_index = Some(6 * 4))),
        ("missing field", header(|h| {
            h.edge_fields.retain(|f| f != "to_node");
        })),
        ("too few declared nodes", header(|h| h.node_count = 3)),
        ("too many declared edges", header(|h| h.edge_count = 6)),
        ("partial node record", replace(good.clone(), |c| {
            if let SnapshotChunk::Nodes(data) = c {
                data.pop();
            }
        })),
        ("edge to misaligned offset", replace(good.clone(), |c| {
            if let SnapshotChunk::Edges(data) = c {
                data[2] = 5;
            }
        })),
        ("unknown edge type", replace(good.clone(), |c| {
            if let SnapshotChunk::Edges(data) = c {
                data[0] = 42;
            }
        })),
        ("type code overflow", replace(good.clone(), |c| {
            if let SnapshotChunk::Nodes(data) = c {
                data[0] = 300;
            }
        })),
        ("dangling name", good
            .iter()
            .filter(|c| !matches!(c, SnapshotChunk::Strings(_)))
            .cloned()
            .collect()),
    ];

    for (what, chunks) in cases {
        match build(chunks).await {
            Ok(_) => panic!("{what}: accepted"),
            Err(err) => assert!(err.is_malformed(), "{what}: {err}"),
        }
    }
}

#[tokio::test]
async fn explicit_root_offset_is_honored() -> Result<()> {
    let mut chunks = sample().chunks();
    if let SnapshotChunk::Header(h) = &mut chunks[0] {
        h.root_index = Some(6);
    }
    let graph = build(chunks).await?;
    assert_eq!(graph.root_index(), NodeIndex(1));
    assert_eq!(graph.root().name(), "Window");
    Ok(())
}
