use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Originating package ecosystem/registry of a dependency coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Forge {
    Crates,
    Golang,
    Maven,
    Npmjs,
    Nuget,
    Pypi,
}

impl Forge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Forge::Crates => "crates",
            Forge::Golang => "golang",
            Forge::Maven => "maven",
            Forge::Npmjs => "npmjs",
            Forge::Nuget => "nuget",
            Forge::Pypi => "pypi",
        }
    }
}

/// Ecosystem-qualified coordinate identifying a dependency.
///
/// Two nodes with equal `ExternalId` anywhere are the same logical
/// dependency: graph merge unifies them instead of duplicating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExternalId {
    pub forge: Forge,
    pub namespace: Option<String>,
    pub name: String,
    pub version: String,
}

impl ExternalId {
    pub fn name_version(forge: Forge, name: impl Into<String>, version: impl Into<String>) -> Self {
        ExternalId {
            forge,
            namespace: None,
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn with_namespace(
        forge: Forge,
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        ExternalId {
            forge,
            namespace: Some(namespace.into()),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Stable textual form used as the artifact key, e.g.
    /// `maven:org.springframework/spring-core@4.3.5` or `npmjs:express@4.18.2`.
    pub fn coordinate(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}/{}@{}", self.forge.as_str(), ns, self.name, self.version),
            None => format!("{}:{}@{}", self.forge.as_str(), self.name, self.version),
        }
    }
}

/// A single node in a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub external_id: ExternalId,
}

impl Dependency {
    pub fn new(external_id: ExternalId) -> Self {
        Dependency {
            name: external_id.name.clone(),
            version: external_id.version.clone(),
            external_id,
        }
    }
}

/// Directed dependency graph with a distinguished root set.
///
/// Edges run parent → child ("requires"). BTree collections keep node and
/// edge iteration deterministic so merged output is reproducible regardless
/// of insertion order.
///
/// Nodes declared via [`add_root`](Self::add_root) stay remembered even
/// after an edge demotes them: when a dependency cycle would otherwise
/// leave part of the graph unreachable, declared roots are reinstated so
/// every node stays reachable from the root set.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<ExternalId, Dependency>,
    children: BTreeMap<ExternalId, BTreeSet<ExternalId>>,
    roots: BTreeSet<ExternalId>,
    declared_roots: BTreeSet<ExternalId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_node(&self, id: &ExternalId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Dependency> {
        self.nodes.values()
    }

    pub fn root_ids(&self) -> impl Iterator<Item = &ExternalId> {
        self.roots.iter()
    }

    pub fn is_root(&self, id: &ExternalId) -> bool {
        self.roots.contains(id)
    }

    pub fn children_of(&self, id: &ExternalId) -> impl Iterator<Item = &ExternalId> {
        self.children.get(id).into_iter().flatten()
    }

    /// Add a dependency as a root of this graph.
    pub fn add_root(&mut self, dependency: Dependency) {
        let id = dependency.external_id.clone();
        self.nodes.entry(id.clone()).or_insert(dependency);
        self.declared_roots.insert(id);
        self.recompute_roots();
    }

    /// Add a dependency as a child of `parent`, inserting the edge.
    ///
    /// The parent node must already be present. A node gaining a parent
    /// loses root status.
    pub fn add_child(&mut self, parent: &ExternalId, dependency: Dependency) {
        let child_id = dependency.external_id.clone();
        self.nodes.entry(child_id.clone()).or_insert(dependency);
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child_id);
        self.recompute_roots();
    }

    /// Insert an edge between two existing nodes.
    pub fn add_edge(&mut self, parent: &ExternalId, child: &ExternalId) {
        self.children
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        self.recompute_roots();
    }

    /// Union another graph into this one, unifying nodes by `ExternalId`.
    ///
    /// Node sets, edge sets, and declared-root sets are unioned; root status
    /// is recomputed after the union so a node that is anyone's child is not
    /// a root. Union of sets makes this commutative, associative, and
    /// idempotent.
    pub fn merge(&mut self, other: &DependencyGraph) {
        for (id, dep) in &other.nodes {
            self.nodes.entry(id.clone()).or_insert_with(|| dep.clone());
        }
        for (parent, kids) in &other.children {
            self.children
                .entry(parent.clone())
                .or_default()
                .extend(kids.iter().cloned());
        }
        self.declared_roots
            .extend(other.declared_roots.iter().cloned());
        self.recompute_roots();
    }

    /// Roots are the declared roots without a parent, plus whichever
    /// declared roots (smallest first) are needed to keep every node of a
    /// cycle reachable. A mutual dev-dependency pair in a lockfile would
    /// otherwise demote both members and empty the root set.
    fn recompute_roots(&mut self) {
        let child_ids: BTreeSet<&ExternalId> = self.children.values().flatten().collect();
        let mut roots: BTreeSet<&ExternalId> = self
            .declared_roots
            .iter()
            .filter(|id| !child_ids.contains(id))
            .collect();

        loop {
            let mut reachable: BTreeSet<&ExternalId> = BTreeSet::new();
            let mut queue: Vec<&ExternalId> = roots.iter().copied().collect();
            while let Some(id) = queue.pop() {
                if !reachable.insert(id) {
                    continue;
                }
                if let Some(kids) = self.children.get(id) {
                    queue.extend(kids.iter());
                }
            }

            match self
                .declared_roots
                .iter()
                .find(|id| !reachable.contains(*id))
            {
                Some(orphan) => {
                    roots.insert(orphan);
                }
                None => break,
            }
        }

        self.roots = roots.into_iter().cloned().collect();
    }

    /// Serializable structural form: components keyed by coordinate,
    /// parent→child relationships, and the root list.
    pub fn to_artifact(&self) -> GraphArtifact {
        let components = self
            .nodes
            .values()
            .map(|dep| ComponentRecord {
                id: dep.external_id.coordinate(),
                forge: dep.external_id.forge,
                namespace: dep.external_id.namespace.clone(),
                name: dep.name.clone(),
                version: dep.version.clone(),
            })
            .collect();

        let mut relationships = Vec::new();
        for (parent, kids) in &self.children {
            for child in kids {
                relationships.push(RelationshipRecord {
                    parent: parent.coordinate(),
                    child: child.coordinate(),
                });
            }
        }

        GraphArtifact {
            components,
            relationships,
            roots: self.roots.iter().map(ExternalId::coordinate).collect(),
        }
    }
}

/// Hand-off form of a dependency graph for serialization collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct GraphArtifact {
    pub components: Vec<ComponentRecord>,
    pub relationships: Vec<RelationshipRecord>,
    pub roots: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentRecord {
    pub id: String,
    pub forge: Forge,
    pub namespace: Option<String>,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipRecord {
    pub parent: String,
    pub child: String,
}
