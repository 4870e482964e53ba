// src/graph/mod.rs

//! Explicit in-memory build graph.
//!
//! - [`node`] holds node/edge payloads and the deterministic path mappings.
//! - [`builder`] turns a [`crate::scan::ProjectScan`] into a [`BuildGraph`].
//!
//! Edge direction follows data flow:
//!
//! ```text
//! source --compiles--> object --owns--> target
//! source --compiles--> object --pools--> common pool --shares--> every target
//! ```
//!
//! The graph is rebuilt from a fresh scan on every invocation; nothing here
//! is persisted.

pub mod builder;
pub mod node;

use std::collections::BTreeMap;
use std::path::PathBuf;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

pub use builder::build_graph;
pub use node::{BuildEdge, BuildNode, ObjectFile, Target};

use crate::scan::SourceFile;

pub type NodeId = NodeIndex;

#[derive(Debug, Clone)]
pub struct BuildGraph {
    graph: DiGraph<BuildNode, BuildEdge>,
    common_pool: NodeId,
    /// Targets by name (sorted).
    targets: BTreeMap<String, NodeId>,
    /// Every object node, in insertion order (common pool first).
    objects: Vec<NodeId>,
    include_paths: Vec<PathBuf>,
    library_paths: Vec<PathBuf>,
}

impl BuildGraph {
    pub(crate) fn new(include_paths: Vec<PathBuf>, library_paths: Vec<PathBuf>) -> Self {
        let mut graph = DiGraph::new();
        let common_pool = graph.add_node(BuildNode::CommonPool);
        Self {
            graph,
            common_pool,
            targets: BTreeMap::new(),
            objects: Vec::new(),
            include_paths,
            library_paths,
        }
    }

    /// Underlying petgraph graph (for rendering).
    pub fn inner(&self) -> &DiGraph<BuildNode, BuildEdge> {
        &self.graph
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    pub fn library_paths(&self) -> &[PathBuf] {
        &self.library_paths
    }

    /// Object ids in the common pool.
    pub fn common_pool(&self) -> Vec<NodeId> {
        self.sorted_neighbors(self.common_pool, Direction::Incoming, BuildEdge::Pools)
    }

    /// All object ids, common pool objects first.
    pub fn objects(&self) -> &[NodeId] {
        &self.objects
    }

    /// Panics if `id` is not an object node; ids only come from this graph.
    pub fn object(&self, id: NodeId) -> &ObjectFile {
        match &self.graph[id] {
            BuildNode::Object(o) => o,
            other => panic!("node {id:?} is not an object: {other}"),
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = (NodeId, &Target)> + '_ {
        self.targets.values().map(|&id| (id, self.target(id)))
    }

    pub fn target_id(&self, name: &str) -> Option<NodeId> {
        self.targets.get(name).copied()
    }

    /// Panics if `id` is not a target node.
    pub fn target(&self, id: NodeId) -> &Target {
        match &self.graph[id] {
            BuildNode::Target(t) => t,
            other => panic!("node {id:?} is not a target: {other}"),
        }
    }

    /// Objects compiled from the target's own directory.
    pub fn own_objects(&self, target: NodeId) -> Vec<NodeId> {
        self.sorted_neighbors(target, Direction::Incoming, BuildEdge::Owns)
    }

    /// Full link input of a target: own objects followed by the common pool.
    pub fn target_objects(&self, target: NodeId) -> Vec<NodeId> {
        let mut objects = self.own_objects(target);
        let shares_pool = self
            .graph
            .edges_connecting(self.common_pool, target)
            .any(|e| *e.weight() == BuildEdge::Shares);
        if shares_pool {
            objects.extend(self.common_pool());
        }
        objects
    }

    /// Targets whose link consumes the given object (directly or through
    /// the common pool), sorted by name.
    pub fn dependents_of(&self, object: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for edge in self.graph.edges_directed(object, Direction::Outgoing) {
            match edge.weight() {
                BuildEdge::Owns => out.push(edge.target()),
                BuildEdge::Pools => out.extend(self.sorted_neighbors(
                    edge.target(),
                    Direction::Outgoing,
                    BuildEdge::Shares,
                )),
                _ => {}
            }
        }
        out.sort_by(|a, b| self.target(*a).name.cmp(&self.target(*b).name));
        out.dedup();
        out
    }

    pub(crate) fn add_source(&mut self, source: SourceFile) -> NodeId {
        self.graph.add_node(BuildNode::Source(source))
    }

    pub(crate) fn add_object(&mut self, source: NodeId, object: ObjectFile) -> NodeId {
        let common = object.common;
        let id = self.graph.add_node(BuildNode::Object(object));
        self.graph.add_edge(source, id, BuildEdge::Compiles);
        if common {
            self.graph.add_edge(id, self.common_pool, BuildEdge::Pools);
        }
        self.objects.push(id);
        id
    }

    pub(crate) fn add_target(&mut self, target: Target, own_objects: &[NodeId]) -> NodeId {
        let name = target.name.clone();
        let id = self.graph.add_node(BuildNode::Target(target));
        for &object in own_objects {
            self.graph.add_edge(object, id, BuildEdge::Owns);
        }
        self.graph.add_edge(self.common_pool, id, BuildEdge::Shares);
        self.targets.insert(name, id);
        id
    }

    fn sorted_neighbors(&self, node: NodeId, dir: Direction, kind: BuildEdge) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .graph
            .edges_directed(node, dir)
            .filter(|e| *e.weight() == kind)
            .map(|e| match dir {
                Direction::Incoming => e.source(),
                Direction::Outgoing => e.target(),
            })
            .collect();
        ids.sort();
        ids
    }
}
