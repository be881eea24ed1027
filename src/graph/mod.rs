//! Dependency graph accumulation.
//!
//! While a project's dependencies are resolved, every observed edge and every
//! artifact resolution result is fed into a [`DependencyGraphBuilder`]. Nodes
//! are identified by artifact coordinate (`group:artifact:baseVersion`), not by
//! the observation that produced them: observing the same artifact again merges
//! the new data into the existing node instead of adding a vertex.
//!
//! When resolution is complete, [`DependencyGraphBuilder::freeze`] turns the
//! builder into an immutable [`DependencyGraph`] for reporting and traversal.
//!
//! # Example
//!
//! ```rust
//! use embkit::graph::{ArtifactCoordinate, DependencyGraphBuilder, DependencyObservation};
//!
//! let obs = |a: &str| DependencyObservation::new(ArtifactCoordinate::new("org.example", a, "1.0"));
//!
//! let mut builder = DependencyGraphBuilder::new();
//! builder.add_root(obs("app"), None);
//! builder.add_dependency(&obs("app"), obs("core"));
//! builder.add_dependency(&obs("app"), obs("util"));
//! builder.add_dependency(&obs("core"), obs("util"));
//!
//! let graph = builder.freeze();
//! assert_eq!(graph.size(), 3);
//! assert_eq!(graph.edge_count(), 3);
//! ```

pub mod walk;

use petgraph::Direction;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, trace};

pub use petgraph::graph::NodeIndex;
pub use walk::{GraphVisitor, TreePrinter, walk_depth_first, walk_from_roots};

/// Extension assumed when a coordinate does not name one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Extension used for a result that carries no artifact at all.
pub const POM_EXTENSION: &str = "pom";

/// Identity of an artifact: `group:artifact[:extension[:classifier]]:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactCoordinate {
    group: String,
    artifact: String,
    version: String,
    extension: String,
    classifier: Option<String>,
}

impl ArtifactCoordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            classifier: None,
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Parse `g:a:v`, `g:a:ext:v` or `g:a:ext:classifier:v`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return None;
        }
        match parts.as_slice() {
            [g, a, v] => Some(Self::new(*g, *a, *v)),
            [g, a, ext, v] => Some(Self::new(*g, *a, *v).with_extension(*ext)),
            [g, a, ext, cls, v] => Some(Self::new(*g, *a, *v).with_extension(*ext).with_classifier(*cls)),
            _ => None,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// The version with a timestamped snapshot (`1.0-20240101.120000-3`)
    /// folded back to `1.0-SNAPSHOT`.
    pub fn base_version(&self) -> String {
        base_version(&self.version)
    }

    pub fn is_snapshot(&self) -> bool {
        self.base_version().ends_with("-SNAPSHOT")
    }

    /// Node identity: `group:artifact:baseVersion`.
    pub fn identity(&self) -> String {
        format!("{}:{}:{}", self.group, self.artifact, self.base_version())
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, ":{}", self.version)
    }
}

fn base_version(version: &str) -> String {
    let mut parts = version.rsplitn(3, '-');
    let (build, timestamp, base) = (parts.next(), parts.next(), parts.next());
    match (base, timestamp, build) {
        (Some(base), Some(timestamp), Some(build))
            if is_snapshot_timestamp(timestamp)
                && !build.is_empty()
                && build.bytes().all(|b| b.is_ascii_digit()) =>
        {
            format!("{base}-SNAPSHOT")
        }
        _ => version.to_string(),
    }
}

// yyyyMMdd.HHmmss
fn is_snapshot_timestamp(s: &str) -> bool {
    s.len() == 15
        && s.bytes().enumerate().all(|(i, b)| if i == 8 { b == b'.' } else { b.is_ascii_digit() })
}

/// A remote repository an artifact was seen in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// One sighting of a dependency during resolution.
///
/// Observations are detached from the graph: they carry no children, so
/// keeping them on a node never makes it traversable through them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyObservation {
    pub coordinate: ArtifactCoordinate,
    pub scope: Option<String>,
    pub optional: bool,
    /// Version before dependency management was applied.
    pub premanaged_version: Option<String>,
    /// Scope before dependency management was applied.
    pub premanaged_scope: Option<String>,
    pub relocations: Vec<ArtifactCoordinate>,
    pub repositories: Vec<RemoteRepository>,
}

impl DependencyObservation {
    pub fn new(coordinate: ArtifactCoordinate) -> Self {
        Self {
            coordinate,
            scope: None,
            optional: false,
            premanaged_version: None,
            premanaged_scope: None,
            relocations: Vec::new(),
            repositories: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_premanaged(mut self, version: Option<&str>, scope: Option<&str>) -> Self {
        self.premanaged_version = version.map(str::to_string);
        self.premanaged_scope = scope.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_relocation(mut self, relocation: ArtifactCoordinate) -> Self {
        self.relocations.push(relocation);
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: RemoteRepository) -> Self {
        self.repositories.push(repository);
        self
    }
}

/// Outcome of resolving one artifact of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactResult {
    /// What was asked for.
    pub requested: Option<ArtifactCoordinate>,
    /// What was resolved, if anything.
    pub artifact: Option<ArtifactCoordinate>,
    /// Local file of the resolved artifact.
    pub file: Option<PathBuf>,
    /// Id of the repository the artifact came from.
    pub repository: Option<String>,
    pub errors: Vec<String>,
}

impl ArtifactResult {
    /// A successful resolution.
    pub fn resolved(artifact: ArtifactCoordinate, file: impl Into<PathBuf>) -> Self {
        Self {
            requested: Some(artifact.clone()),
            artifact: Some(artifact),
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /// A failed resolution of `requested`.
    pub fn failed(requested: ArtifactCoordinate, error: impl Into<String>) -> Self {
        Self {
            requested: Some(requested),
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// True when an artifact with a local file was produced.
    pub fn is_resolved(&self) -> bool {
        self.artifact.is_some() && self.file.is_some()
    }
}

/// Descriptive data attached to a root node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: Option<String>,
    pub packaging: Option<String>,
    /// Location of the project's build file.
    pub path: Option<PathBuf>,
}

/// A vertex of the dependency graph: everything learned about one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepGraphNode {
    identity: String,
    latest_artifact: Option<ArtifactCoordinate>,
    latest_result: Option<String>,
    observations: Vec<DependencyObservation>,
    repositories: Vec<RemoteRepository>,
    results: BTreeMap<String, ArtifactResult>,
    pre_resolved: bool,
    disconnected: bool,
    project: Option<ProjectMeta>,
}

impl DepGraphNode {
    fn from_observation(observation: DependencyObservation) -> Self {
        let mut node = Self::from_artifact(&observation.coordinate, false);
        node.merge_observation(observation);
        node
    }

    fn from_artifact(artifact: &ArtifactCoordinate, pre_resolved: bool) -> Self {
        Self {
            identity: artifact.identity(),
            latest_artifact: Some(artifact.clone()),
            latest_result: None,
            observations: Vec::new(),
            repositories: Vec::new(),
            results: BTreeMap::new(),
            pre_resolved,
            disconnected: false,
            project: None,
        }
    }

    /// `group:artifact:baseVersion`
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn latest_artifact(&self) -> Option<&ArtifactCoordinate> {
        self.latest_artifact.as_ref()
    }

    /// The most recently accepted result.
    pub fn latest_result(&self) -> Option<&ArtifactResult> {
        self.latest_result.as_ref().and_then(|ext| self.results.get(ext))
    }

    /// Every distinct observation, in the order first seen.
    pub fn observations(&self) -> &[DependencyObservation] {
        &self.observations
    }

    /// Repositories the artifact was seen in, in the order first seen.
    pub fn repositories(&self) -> &[RemoteRepository] {
        &self.repositories
    }

    pub fn result(&self, extension: &str) -> Option<&ArtifactResult> {
        self.results.get(extension)
    }

    /// Results keyed by artifact extension.
    pub fn results(&self) -> impl Iterator<Item = (&str, &ArtifactResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_pre_resolved(&self) -> bool {
        self.pre_resolved
    }

    /// Excluded from traversal (e.g. it lost a version conflict).
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    pub fn project(&self) -> Option<&ProjectMeta> {
        self.project.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        self.results.values().any(|r| !r.errors.is_empty())
    }

    /// Errors of every result, grouped by extension order.
    pub fn errors(&self) -> Vec<&str> {
        self.results.values().flat_map(|r| r.errors.iter().map(String::as_str)).collect()
    }

    /// Multi-line report of every resolution attempt for this node.
    pub fn render_errors(&self) -> String {
        let mut out = format!("Failed to resolve: {}", self.identity);
        out.push_str(&format!(
            "\n\n{} Resolution attempts (may be for different artifacts within the same project):",
            self.results.len()
        ));
        for (extension, result) in &self.results {
            if result.errors.is_empty() {
                out.push_str(&format!(
                    "\nNo resolution errors recorded for artifact of type: '{extension}'."
                ));
            } else {
                out.push_str(&format!("\nErrors for artifact of type: '{extension}':"));
                for error in &result.errors {
                    out.push_str(&format!("\n  - {error}"));
                }
            }
        }
        out
    }

    /// Fold another sighting of this artifact into the node.
    pub fn merge_observation(&mut self, observation: DependencyObservation) {
        for repository in &observation.repositories {
            if !self.repositories.contains(repository) {
                self.repositories.push(repository.clone());
            }
        }
        if self.latest_artifact.is_none() {
            self.latest_artifact = Some(observation.coordinate.clone());
        }
        if !self.observations.contains(&observation) {
            self.observations.push(observation);
        }
    }

    /// Record a resolution result under its artifact extension.
    ///
    /// A result with a resolved file has its errors cleared. A result never
    /// replaces one that already resolved an artifact for the same extension.
    pub fn merge_result(&mut self, mut result: ArtifactResult) {
        if result.is_resolved() {
            result.errors.clear();
        }

        let extension = if let Some(artifact) = &result.artifact {
            self.latest_artifact = Some(artifact.clone());
            Some(artifact.extension().to_string())
        } else if let Some(requested) = &result.requested {
            self.latest_artifact = Some(requested.clone());
            Some(requested.extension().to_string())
        } else if let Some(latest) = &self.latest_artifact {
            Some(latest.extension().to_string())
        } else if !self.results.contains_key(POM_EXTENSION) {
            Some(POM_EXTENSION.to_string())
        } else {
            None
        };

        let Some(extension) = extension else {
            debug!("Cannot determine artifact extension for result of {}; dropping it", self.identity);
            return;
        };

        if self.results.get(&extension).is_some_and(|existing| existing.artifact.is_some()) {
            debug!(
                "Result for {} ({extension}) already holds a resolved artifact; keeping it",
                self.identity
            );
            return;
        }
        self.results.insert(extension.clone(), result);
        self.latest_result = Some(extension);
    }

    pub fn remove_result(&mut self, extension: &str) -> Option<ArtifactResult> {
        let removed = self.results.remove(extension);
        if self.latest_result.as_deref() == Some(extension) {
            self.latest_result = None;
        }
        removed
    }
}

impl fmt::Display for DepGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

fn children_in_order(graph: &DiGraph<DepGraphNode, ()>, node: NodeIndex) -> Vec<NodeIndex> {
    let mut children: Vec<NodeIndex> = graph.neighbors_directed(node, Direction::Outgoing).collect();
    // petgraph yields the most recent edge first
    children.reverse();
    children
}

/// Mutable graph used while dependencies are being resolved.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphBuilder {
    graph: DiGraph<DepGraphNode, ()>,
    node_map: HashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_or_add(&mut self, node: DepGraphNode) -> (NodeIndex, bool) {
        if let Some(&index) = self.node_map.get(node.identity()) {
            (index, true)
        } else {
            let identity = node.identity.clone();
            let index = self.graph.add_node(node);
            trace!("Added graph node {identity}");
            self.node_map.insert(identity, index);
            (index, false)
        }
    }

    fn connect(&mut self, from: NodeIndex, to: NodeIndex) {
        if from == to {
            trace!("Ignoring self-dependency of {}", self.graph[from].identity);
        } else if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// Add (or merge into) a root node.
    pub fn add_root(&mut self, observation: DependencyObservation, project: Option<ProjectMeta>) -> NodeIndex {
        let identity = observation.coordinate.identity();
        let index = match self.node_map.get(&identity) {
            Some(&index) => {
                self.graph[index].merge_observation(observation);
                index
            }
            None => self.find_or_add(DepGraphNode::from_observation(observation)).0,
        };
        if !self.roots.contains(&index) {
            self.roots.push(index);
        }
        if project.is_some() {
            self.graph[index].project = project;
        }
        index
    }

    /// Record that `parent` depends on `child`.
    ///
    /// An existing child node absorbs the new observation. Returns the parent
    /// and child indices.
    pub fn add_dependency(
        &mut self,
        parent: &DependencyObservation,
        child: DependencyObservation,
    ) -> (NodeIndex, NodeIndex) {
        let (from, _) = self.find_or_add(DepGraphNode::from_observation(parent.clone()));
        let to = match self.node_map.get(&child.coordinate.identity()) {
            Some(&index) => {
                self.graph[index].merge_observation(child);
                index
            }
            None => self.find_or_add(DepGraphNode::from_observation(child)).0,
        };
        self.connect(from, to);
        (from, to)
    }

    /// Record a dependency known only by coordinates.
    pub fn add_artifact_dependency(
        &mut self,
        parent: &ArtifactCoordinate,
        child: &ArtifactCoordinate,
        parent_pre_resolved: bool,
        child_pre_resolved: bool,
    ) -> (NodeIndex, NodeIndex) {
        let (from, _) = self.find_or_add(DepGraphNode::from_artifact(parent, parent_pre_resolved));
        let (to, existed) = self.find_or_add(DepGraphNode::from_artifact(child, child_pre_resolved));
        if existed {
            self.graph[to].merge_observation(DependencyObservation::new(child.clone()));
        }
        self.connect(from, to);
        (from, to)
    }

    /// Attach a resolution result to the node for `artifact`, adding the node if needed.
    pub fn add_node_result(&mut self, artifact: &ArtifactCoordinate, result: ArtifactResult) -> NodeIndex {
        let (index, _) = self.find_or_add(DepGraphNode::from_artifact(artifact, false));
        self.graph[index].merge_result(result);
        index
    }

    /// Exclude a node from further traversal; it stays in the graph.
    pub fn mark_disconnected(&mut self, index: NodeIndex) -> bool {
        match self.graph.node_weight_mut(index) {
            Some(node) => {
                node.disconnected = true;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, artifact: &ArtifactCoordinate) -> bool {
        self.node_map.contains_key(&artifact.identity())
    }

    pub fn find(&self, artifact: &ArtifactCoordinate) -> Option<NodeIndex> {
        self.node_map.get(&artifact.identity()).copied()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&DepGraphNode> {
        self.graph.node_weight(index)
    }

    /// Number of distinct nodes.
    pub fn size(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Root nodes in the order they were first added.
    pub fn roots(&self) -> impl Iterator<Item = &DepGraphNode> {
        self.roots.iter().map(|&i| &self.graph[i])
    }

    /// All nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DepGraphNode> {
        self.graph.node_indices().map(|i| &self.graph[i])
    }

    /// Stop accepting changes and return the finished graph.
    pub fn freeze(self) -> DependencyGraph {
        debug!(
            "Freezing dependency graph: {} node(s), {} edge(s), {} root(s)",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.roots.len()
        );
        DependencyGraph {
            graph: self.graph,
            node_map: self.node_map,
            roots: self.roots,
        }
    }
}

/// Immutable snapshot of a resolved dependency graph.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<DepGraphNode, ()>,
    node_map: HashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn size(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, artifact: &ArtifactCoordinate) -> bool {
        self.node_map.contains_key(&artifact.identity())
    }

    pub fn find(&self, artifact: &ArtifactCoordinate) -> Option<NodeIndex> {
        self.node_map.get(&artifact.identity()).copied()
    }

    pub fn find_identity(&self, identity: &str) -> Option<NodeIndex> {
        self.node_map.get(identity).copied()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&DepGraphNode> {
        self.graph.node_weight(index)
    }

    /// Root indices in the order they were first added.
    pub fn root_indices(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &DepGraphNode> {
        self.roots.iter().map(|&i| &self.graph[i])
    }

    /// All nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DepGraphNode> {
        self.graph.node_indices().map(|i| &self.graph[i])
    }

    /// Direct dependencies of `index` in the order they were added. Empty for
    /// disconnected nodes.
    pub fn children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        match self.graph.node_weight(index) {
            Some(node) if !node.disconnected => children_in_order(&self.graph, index),
            _ => Vec::new(),
        }
    }

    /// Nodes that depend directly on `index`.
    pub fn parents(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut parents: Vec<NodeIndex> = self.graph.neighbors_directed(index, Direction::Incoming).collect();
        parents.reverse();
        parents
    }

    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.graph.contains_edge(from, to)
    }

    /// Nodes with at least one failed resolution, in insertion order.
    pub fn nodes_with_errors(&self) -> impl Iterator<Item = &DepGraphNode> {
        self.iter().filter(|n| n.has_errors())
    }

    /// Numbered tree of every root, marking repeated nodes as duplicates.
    pub fn to_tree_string(&self) -> String {
        TreePrinter::new().print(self)
    }
}
