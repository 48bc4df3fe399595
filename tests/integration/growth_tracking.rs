use std::sync::atomic::Ordering;
use std::sync::Arc;

use leakscope::growth::{CounterMetrics, GrowthStatus, HeapGrowthTracker, TrackerOptions};
use leakscope::heap::{from_chunks, SnapshotBuilder, SnapshotChunk, DOM_TREES_ROOT};
use leakscope::report::{growing_path_tree, path_to_string, PathKey};
use leakscope::types::{NodeIndex, SnapshotEdgeType as E, SnapshotNodeType as N};
use leakscope::Result;

/// A browser-like page: the root holds Window through a shortcut edge, GC
/// roots, and the DOM trees root. `items` objects hang off `Window.foo`, and
/// `cache` objects off `Window.cache`. Every third item is also referenced by
/// a long-lived registry so it is not solely retained by the leak.
struct Page {
    items: u32,
    cache: u32,
    closure_vars: u32,
}

impl Page {
    fn new(items: u32) -> Self {
        Self {
            items,
            cache: 2,
            closure_vars: 1,
        }
    }

    fn cache(mut self, cache: u32) -> Self {
        self.cache = cache;
        self
    }

    fn closure_vars(mut self, vars: u32) -> Self {
        self.closure_vars = vars;
        self
    }

    fn builder(&self) -> SnapshotBuilder {
        let mut b = SnapshotBuilder::new().records_per_chunk(3);
        let root = b.node(N::Synthetic, "", 0);
        let gc = b.node(N::Synthetic, "(GC roots)", 0);
        let window = b.node(N::Object, "Window", 64);
        let dom = b.node(N::Synthetic, DOM_TREES_ROOT, 0);
        let leaky = b.node(N::Object, "Leaky", 16);
        let registry = b.node(N::Array, "Registry", 8);
        let cache = b.node(N::Object, "Cache", 24);
        let handler = b.node(N::Closure, "onClick", 32);
        let scope = b.node(N::Object, "system / Context", 16);

        b.edge(root, E::Element, 1, gc);
        b.named(root, E::Shortcut, "window", window);
        b.edge(root, E::Element, 3, dom);
        b.property(window, "foo", leaky);
        b.property(window, "registry", registry);
        b.property(window, "cache", cache);
        b.property(window, "onClick", handler);
        b.named(handler, E::Internal, "context", scope);

        for i in 0..self.items {
            let item = b.node(N::Object, "Item", 10);
            b.property(leaky, &format!("k{i}"), item);
            if i % 3 == 0 {
                b.edge(registry, E::Element, i, item);
            }
        }
        for i in 0..self.cache {
            let entry = b.node(N::String, "entry", 20);
            b.property(cache, &format!("c{i}"), entry);
        }
        for i in 0..self.closure_vars {
            let var = b.node(N::Object, "Captured", 6);
            b.named(scope, E::ContextVariable, &format!("v{i}"), var);
        }
        b
    }
}

const LEAKY: NodeIndex = NodeIndex(4);
const CACHE: NodeIndex = NodeIndex(6);
const SCOPE: NodeIndex = NodeIndex(8);

async fn add(tracker: &mut HeapGrowthTracker, page: &Page) -> Result<()> {
    tracker.add_snapshot(&mut from_chunks(page.builder().chunks())).await
}

#[tokio::test]
async fn steadily_growing_object_is_reported() -> Result<()> {
    let mut tracker = HeapGrowthTracker::new();
    for items in [2, 3, 5] {
        add(&mut tracker, &Page::new(items)).await?;
    }
    assert_eq!(tracker.snapshot_count(), 3);
    assert!(tracker.is_growing(LEAKY));
    assert!(!tracker.is_growing(CACHE));

    let objects = tracker.growing_paths();
    assert_eq!(objects.len(), 1);
    let leak = &objects[0];
    assert_eq!(leak.node, LEAKY);

    let graph = tracker.graph().expect("graph");
    let rendered: Vec<_> = leak
        .paths
        .iter()
        .map(|p| path_to_string(graph, p))
        .collect::<Result<_>>()?;
    assert_eq!(rendered, vec!["global['foo']".to_owned()]);

    // Items 0 and 3 are also held by the registry.
    assert_eq!(leak.retained_size, 16 + 3 * 10);
    assert_eq!(leak.adjusted_retained_size, 46.0);
    assert_eq!(leak.transitive_closure_size, 16 + 5 * 10);
    Ok(())
}

#[tokio::test]
async fn one_pause_in_growth_is_permanent() -> Result<()> {
    let mut tracker = HeapGrowthTracker::new();
    add(&mut tracker, &Page::new(2)).await?;
    add(&mut tracker, &Page::new(3)).await?;
    assert!(tracker.is_growing(LEAKY));
    add(&mut tracker, &Page::new(3)).await?;
    assert_eq!(tracker.growth_status(LEAKY), Some(GrowthStatus::NotGrowing));
    add(&mut tracker, &Page::new(9)).await?;
    assert_eq!(tracker.growth_status(LEAKY), Some(GrowthStatus::NotGrowing));
    assert!(tracker.growing_paths().is_empty());
    Ok(())
}

#[tokio::test]
async fn closure_scopes_render_under_scope_key() -> Result<()> {
    let mut tracker = HeapGrowthTracker::new();
    add(&mut tracker, &Page::new(2).closure_vars(1)).await?;
    add(&mut tracker, &Page::new(3).closure_vars(2)).await?;
    add(&mut tracker, &Page::new(4).closure_vars(4)).await?;

    let objects = tracker.growing_paths();
    let nodes: Vec<_> = objects.iter().map(|o| o.node).collect();
    assert_eq!(nodes, vec![LEAKY, SCOPE], "ordered by node index");

    let graph = tracker.graph().expect("graph");
    assert_eq!(
        path_to_string(graph, &objects[1].paths[0])?,
        "global['onClick']['context']"
    );
    let tree = growing_path_tree(graph, &objects)?;
    assert_eq!(tree.len(), 2);
    let on_click = tree
        .iter()
        .find(|t| t.index_or_name == PathKey::Name("onClick".into()))
        .expect("onClick entry");
    assert!(!on_click.is_growing);
    assert_eq!(on_click.children.len(), 1);
    assert_eq!(on_click.children[0].index_or_name, PathKey::Name("__scope__".into()));
    assert_eq!(on_click.children[0].id, Some(SCOPE.0));
    Ok(())
}

#[tokio::test]
async fn shared_growth_splits_adjusted_size() -> Result<()> {
    // Two growing holders share every child.
    fn page(n: u32) -> SnapshotBuilder {
        let mut b = SnapshotBuilder::new();
        let root = b.node(N::Synthetic, "", 0);
        let window = b.node(N::Object, "Window", 8);
        let a = b.node(N::Object, "A", 12);
        let c = b.node(N::Object, "B", 12);
        b.named(root, E::Shortcut, "window", window);
        b.property(window, "a", a);
        b.property(window, "b", c);
        for i in 0..n {
            let child = b.node(N::Object, "Child", 30);
            b.property(a, &format!("x{i}"), child);
            b.property(c, &format!("y{i}"), child);
        }
        b
    }
    let mut tracker = HeapGrowthTracker::new();
    for n in [1, 2, 4] {
        tracker.add_snapshot(&mut from_chunks(page(n).chunks())).await?;
    }
    let analysis = tracker.analyze().expect("analysis");
    assert_eq!(analysis.objects.len(), 2);
    for object in &analysis.objects {
        assert_eq!(object.retained_size, 12, "children are shared");
        assert_eq!(object.adjusted_retained_size, 12.0 + 4.0 * 30.0 / 2.0);
        assert_eq!(object.transitive_closure_size, 12 + 4 * 30);
    }
    let total: f64 = analysis
        .objects
        .iter()
        .map(|o| o.adjusted_retained_size)
        .sum();
    assert_eq!(total, 24.0 + 4.0 * 30.0);
    assert!(analysis.diagnostics.leak_refs.iter().any(|&r| r == 2));
    Ok(())
}

#[tokio::test]
async fn rejected_snapshots_do_not_disturb_tracking() -> Result<()> {
    let metrics = Arc::new(CounterMetrics::default());
    let mut tracker =
        HeapGrowthTracker::with_options(TrackerOptions::new().metrics(metrics.clone()));
    add(&mut tracker, &Page::new(2).cache(3)).await?;
    add(&mut tracker, &Page::new(3).cache(3)).await?;
    let interned = tracker.strings().len();

    // Record chunks fine, but the edge names a string the table never provides.
    let mut chunks = Page::new(4).builder().chunks();
    chunks.retain(|c| !matches!(c, SnapshotChunk::Strings(_)));
    chunks.push(SnapshotChunk::Strings(vec!["never-interned".into()]));
    let err = tracker
        .add_snapshot(&mut from_chunks(chunks))
        .await
        .expect_err("dangling string slot");
    assert!(err.is_malformed());
    assert_eq!(tracker.strings().len(), interned);
    assert!(tracker.strings().get("never-interned").is_none());

    let truncated: Vec<_> = Page::new(4)
        .builder()
        .chunks()
        .into_iter()
        .filter(|c| !matches!(c, SnapshotChunk::Edges(_)))
        .collect();
    assert!(tracker.add_snapshot(&mut from_chunks(truncated)).await.is_err());

    assert_eq!(tracker.snapshot_count(), 2);
    assert!(tracker.is_growing(LEAKY));

    add(&mut tracker, &Page::new(4).cache(3)).await?;
    assert!(tracker.is_growing(LEAKY));
    assert_eq!(metrics.snapshots_added.load(Ordering::Relaxed), 3);
    assert_eq!(metrics.snapshots_rejected.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.merges.load(Ordering::Relaxed), 2);
    Ok(())
}

/// `X` gains a named property while its values stay reachable from Window.
fn x_snapshot(props: usize) -> SnapshotBuilder {
    let mut b = SnapshotBuilder::new();
    let root = b.node(N::Synthetic, "", 0);
    let window = b.node(N::Object, "Window", 32);
    let x = b.node(N::Object, "X", 48);
    let value = b.node(N::HeapNumber, "number", 16);
    b.named(root, E::Shortcut, "window", window);
    b.property(window, "foo", x);
    b.property(window, "answer", value);
    for i in 0..props {
        b.property(x, &format!("p{i}"), value);
    }
    b
}

#[tokio::test]
async fn property_added_under_global_is_a_sole_leak() -> Result<()> {
    let mut tracker = HeapGrowthTracker::new();
    tracker.add_snapshot(&mut from_chunks(x_snapshot(2).chunks())).await?;
    tracker.add_snapshot(&mut from_chunks(x_snapshot(3).chunks())).await?;

    let objects = tracker.growing_paths();
    assert_eq!(objects.len(), 1);
    let x = &objects[0];
    let graph = tracker.graph().expect("graph");
    assert_eq!(x.node(graph).name(), "X");
    assert_eq!(x.paths.len(), 1);
    assert_eq!(path_to_string(graph, &x.paths[0])?, "global['foo']");
    assert_eq!(x.retained_size, 48);
    assert_eq!(x.adjusted_retained_size, 48.0);
    assert!(x.transitive_closure_size >= x.retained_size);
    assert_eq!(x.transitive_closure_size, 48 + 16);
    Ok(())
}

#[tokio::test]
async fn misaligned_node_chunk_keeps_previous_state() -> Result<()> {
    let mut tracker = HeapGrowthTracker::new();
    tracker.add_snapshot(&mut from_chunks(x_snapshot(2).chunks())).await?;
    tracker.add_snapshot(&mut from_chunks(x_snapshot(3).chunks())).await?;
    let before = tracker.growing_paths();
    let nodes_before = tracker.graph().map(|g| g.node_count());

    let mut chunks = x_snapshot(4).chunks();
    for chunk in &mut chunks {
        if let SnapshotChunk::Nodes(data) = chunk {
            data.push(0);
        }
    }
    let err = tracker
        .add_snapshot(&mut from_chunks(chunks))
        .await
        .expect_err("misaligned node data");
    assert!(matches!(err, leakscope::LeakError::MalformedSnapshot(_)));
    assert_eq!(tracker.snapshot_count(), 2);
    assert_eq!(tracker.graph().map(|g| g.node_count()), nodes_before);
    assert_eq!(tracker.growing_paths(), before);
    Ok(())
}

/// Window.foo -> Leaky -> {Item * n, shared -> Shared}. The DOM trees root
/// holds a document that also references Shared and owns a growing DomLeak.
/// Window reaches the document only through a native internal edge.
fn dom_snapshot(n: u32) -> SnapshotBuilder {
    let mut b = SnapshotBuilder::new();
    let root = b.node(N::Synthetic, "", 0);
    let window = b.node(N::Object, "Window", 32);
    let dom = b.node(N::Synthetic, DOM_TREES_ROOT, 0);
    let doc = b.node(N::Native, "Document DOM tree / 1", 40);
    let leaky = b.node(N::Object, "Leaky", 16);
    let shared = b.node(N::Object, "Shared", 100);
    let dom_leak = b.node(N::Native, "DomLeak", 12);
    b.named(root, E::Shortcut, "window", window);
    b.edge(root, E::Element, 1, dom);
    b.edge(dom, E::Element, 0, doc);
    b.property(window, "foo", leaky);
    b.named(window, E::Internal, "native", doc);
    b.property(doc, "shared", shared);
    b.property(doc, "leak", dom_leak);
    b.property(leaky, "shared", shared);
    for i in 0..n {
        let item = b.node(N::Object, "Item", 10);
        b.property(leaky, &format!("i{i}"), item);
        let cell = b.node(N::Native, "Cell", 4);
        b.property(dom_leak, &format!("c{i}"), cell);
    }
    b
}

fn find(graph: &leakscope::HeapGraph, name: &str) -> NodeIndex {
    (0..graph.node_count() as u32)
        .map(NodeIndex)
        .find(|&i| graph.node(i).name() == name)
        .expect("node present")
}

#[tokio::test]
async fn dom_is_excluded_from_paths_but_counted_for_sizes() -> Result<()> {
    let mut tracker = HeapGrowthTracker::new();
    for n in [1, 2, 3] {
        tracker.add_snapshot(&mut from_chunks(dom_snapshot(n).chunks())).await?;
    }
    let analysis = tracker.analyze().expect("analysis");
    let graph = tracker.graph().expect("graph");
    let leaky = find(graph, "Leaky");
    let shared = find(graph, "Shared");
    let dom_leak = find(graph, "DomLeak");

    // DomLeak grows but is only reachable through the DOM.
    assert!(tracker.is_growing(dom_leak));
    let nodes: Vec<_> = analysis.objects.iter().map(|o| o.node).collect();
    assert_eq!(nodes, vec![leaky]);

    let leak = &analysis.objects[0];
    assert_eq!(leak.paths.len(), 1);
    assert_eq!(path_to_string(graph, &leak.paths[0])?, "global['foo']");
    // Shared is held by the document, so it is not retained by the leak.
    assert!(analysis.diagnostics.non_leak_visits.get(shared.as_usize()));
    assert_eq!(analysis.diagnostics.leak_refs[shared.as_usize()], 0);
    assert_eq!(leak.retained_size, 16 + 3 * 10);
    assert_eq!(leak.adjusted_retained_size, 46.0);
    assert_eq!(leak.transitive_closure_size, 16 + 3 * 10 + 100);
    Ok(())
}
