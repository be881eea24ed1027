//! Accumulating a dependency graph the way a resolution session reports it.

use embkit::graph::{
    ArtifactCoordinate, ArtifactResult, DependencyGraph, DependencyGraphBuilder, DependencyObservation,
    GraphVisitor, NodeIndex, ProjectMeta, RemoteRepository, walk_depth_first,
};
use embkit::test_utils::{coordinate, graph_from_edges, observation};

#[test]
fn test_shared_dependency_is_one_node() {
    let graph = graph_from_edges("r", &[("r", "a"), ("r", "b"), ("a", "c"), ("b", "c")]).freeze();

    assert_eq!(graph.size(), 4);
    assert_eq!(graph.edge_count(), 4);
    let c = graph.find(&coordinate("c")).unwrap();
    assert_eq!(graph.parents(c).len(), 2);
    assert!(graph.children(c).is_empty());
}

#[test]
fn test_snapshot_versions_share_a_node() {
    let mut builder = DependencyGraphBuilder::new();
    let root = observation("app");
    builder.add_root(root.clone(), None);

    let timestamped = ArtifactCoordinate::new("org.example", "lib", "2.0-20250101.101010-4");
    let plain = ArtifactCoordinate::new("org.example", "lib", "2.0-SNAPSHOT");
    builder.add_dependency(&root, DependencyObservation::new(timestamped));
    builder.add_dependency(&root, DependencyObservation::new(plain.clone()));

    assert_eq!(builder.size(), 2);
    assert_eq!(builder.edge_count(), 1);
    assert!(builder.contains(&plain));
}

#[test]
fn test_resolution_session() {
    let central = RemoteRepository::new("central", "https://repo.maven.apache.org/maven2");
    let mut builder = DependencyGraphBuilder::new();
    builder.add_root(
        observation("app"),
        Some(ProjectMeta {
            name: Some("app".to_string()),
            packaging: Some("jar".to_string()),
            path: None,
        }),
    );
    builder.add_dependency(&observation("app"), observation("core").with_scope("compile").with_repository(central.clone()));
    builder.add_dependency(&observation("app"), observation("broken").with_scope("runtime"));

    builder.add_node_result(
        &coordinate("core"),
        ArtifactResult::resolved(coordinate("core"), "/m2/core-1.0.jar").with_repository("central"),
    );
    builder.add_node_result(&coordinate("broken"), ArtifactResult::failed(coordinate("broken"), "Could not find artifact"));
    // a late failure never replaces a resolved artifact
    builder.add_node_result(&coordinate("core"), ArtifactResult::failed(coordinate("core"), "checksum failure"));

    let graph = builder.freeze();
    let roots: Vec<_> = graph.roots().collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].project().and_then(|p| p.name.as_deref()), Some("app"));

    let core = graph.node(graph.find(&coordinate("core")).unwrap()).unwrap();
    assert!(!core.has_errors());
    assert_eq!(core.repositories(), &[central]);

    let failing: Vec<_> = graph.nodes_with_errors().collect();
    assert_eq!(failing.len(), 1);
    let report = failing[0].render_errors();
    assert!(report.contains("Failed to resolve: org.example:broken:1.0"));
    assert!(report.contains("Could not find artifact"));
}

#[test]
fn test_conflict_loser_is_not_traversed() {
    let mut builder = graph_from_edges("r", &[("r", "a"), ("a", "old-lib"), ("r", "b")]);
    let loser = builder.find(&coordinate("a")).unwrap();
    builder.mark_disconnected(loser);
    let graph = builder.freeze();

    struct Collect(Vec<String>);
    impl GraphVisitor for Collect {
        fn start_vertex_visit(&mut self, graph: &DependencyGraph, node: NodeIndex) -> bool {
            self.0.push(graph.node(node).unwrap().identity().to_string());
            true
        }
    }

    let mut visitor = Collect(Vec::new());
    let root = graph.root_indices()[0];
    walk_depth_first(&graph, root, &mut visitor);
    assert_eq!(visitor.0, vec!["org.example:r:1.0", "org.example:a:1.0", "org.example:b:1.0"]);
    assert_eq!(graph.size(), 4);
}

#[test]
fn test_tree_output() {
    let graph = graph_from_edges("r", &[("r", "a"), ("r", "b"), ("a", "c"), ("b", "c")]).freeze();
    let tree = graph.to_tree_string();
    let lines: Vec<&str> = tree.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "1:  >0 org.example:r:1.0");
    assert!(lines[4].ends_with("org.example:c:1.0 -DUPLICATE- (see line: 3)"));
}
