//! The merged configuration tree
//!
//! This module holds the result of folding every config definition into one
//! tree, and the [`builder`] that does the folding.
//!
//! ## Layout
//!
//! Nodes live in an arena ([`ConfigurationTree`]) and are addressed by
//! [`NodeId`]. A node stores its parent's id and its children as an
//! insertion-ordered map from *indexed* name (`foo[1]`, `foo[2]`) to id, so
//! the map order is the sibling order. Same-name siblings are always numbered
//! 1..N without gaps.
//!
//! Deleted nodes are never dropped from the arena. They are unlinked from
//! their parent, flagged `deleted` and recorded as tombstones keyed by their
//! path at deletion time. A tombstone still holds the subtree it had when it
//! was deleted, so "explicitly deleted" can be told apart from "never
//! defined" for any path below it.

pub mod builder;

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;

use crate::definition::{property_path, Category, PropertyKind, Value, ValueType};
use crate::path::{NodePath, PathSegment};

pub use builder::ConfigurationTreeBuilder;

/// Arena index of a configuration node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Which definition item contributed to a merged node or property
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemOrigin {
    /// Full name of the module (`group/project/module`).
    pub module: String,
    /// Source path, relative to the module's config folder.
    pub source: String,
    /// Path of the item inside the definition.
    pub path: String,
}

impl fmt::Display for ItemOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.module, self.source, self.path)
    }
}

/// A category set on a node for one child (or for all unlisted children)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOverride {
    pub category: Category,
    pub origin: ItemOrigin,
}

/// A merged property
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationProperty {
    pub(crate) name: String,
    pub(crate) kind: PropertyKind,
    pub(crate) value_type: ValueType,
    pub(crate) values: Vec<Value>,
    pub(crate) definitions: Vec<ItemOrigin>,
    pub(crate) deleted: bool,
}

impl ConfigurationProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The value of a single-valued property.
    pub fn value(&self) -> Option<&Value> {
        match self.kind {
            PropertyKind::Single => self.values.first(),
            PropertyKind::List => None,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Contributing definition items, oldest first.
    pub fn definitions(&self) -> &[ItemOrigin] {
        &self.definitions
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

/// A merged node
#[derive(Debug, Clone)]
pub struct ConfigurationNode {
    pub(crate) segment: PathSegment,
    pub(crate) parent: Option<NodeId>,
    pub(crate) definitions: Vec<ItemOrigin>,
    pub(crate) deleted: bool,
    pub(crate) children: IndexMap<String, NodeId>,
    pub(crate) properties: IndexMap<String, ConfigurationProperty>,
    pub(crate) residual_child_node_category: Option<CategoryOverride>,
    pub(crate) child_node_categories: BTreeMap<String, CategoryOverride>,
    pub(crate) child_property_categories: BTreeMap<String, CategoryOverride>,
    pub(crate) pending_order_before: Option<String>,
}

impl ConfigurationNode {
    fn new(segment: PathSegment, parent: Option<NodeId>) -> Self {
        Self {
            segment,
            parent,
            definitions: Vec::new(),
            deleted: false,
            children: IndexMap::new(),
            properties: IndexMap::new(),
            residual_child_node_category: None,
            child_node_categories: BTreeMap::new(),
            child_property_categories: BTreeMap::new(),
            pending_order_before: None,
        }
    }

    /// Name with its explicit index, e.g. `foo[1]`. Empty for the root.
    pub fn indexed_name(&self) -> String {
        self.segment.to_string()
    }

    /// Name as it is printed in paths, e.g. `foo` or `foo[2]`.
    pub fn name(&self) -> String {
        self.segment.suppress_index().to_string()
    }

    pub fn segment(&self) -> &PathSegment {
        &self.segment
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn definitions(&self) -> &[ItemOrigin] {
        &self.definitions
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Children in sibling order, keyed by indexed name.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        let key = PathSegment::parse(name).ok()?.force_index().to_string();
        self.children.get(&key).copied()
    }

    pub fn properties(&self) -> impl Iterator<Item = &ConfigurationProperty> {
        self.properties.values()
    }

    pub fn property(&self, name: &str) -> Option<&ConfigurationProperty> {
        self.properties.get(name)
    }

    pub fn residual_child_node_category(&self) -> Option<&CategoryOverride> {
        self.residual_child_node_category.as_ref()
    }

    pub fn child_node_category_overrides(&self) -> &BTreeMap<String, CategoryOverride> {
        &self.child_node_categories
    }

    pub fn child_property_category_overrides(&self) -> &BTreeMap<String, CategoryOverride> {
        &self.child_property_categories
    }

    /// Category of the child node `name`: its override, else the residual
    /// category, else config.
    pub fn child_node_category(&self, name: &str) -> Category {
        let base = PathSegment::parse(name)
            .map(|s| s.name().to_string())
            .unwrap_or_else(|_| name.to_string());
        self.child_node_categories
            .get(&base)
            .or(self.residual_child_node_category.as_ref())
            .map(|o| o.category)
            .unwrap_or(Category::Config)
    }

    pub fn child_property_category(&self, name: &str) -> Category {
        self.child_property_categories
            .get(name)
            .map(|o| o.category)
            .unwrap_or(Category::Config)
    }

    /// An `order-before` target that did not exist when it was requested.
    pub fn pending_order_before(&self) -> Option<&str> {
        self.pending_order_before.as_deref()
    }
}

/// Result of a tombstone query
#[derive(Debug, Clone, Copy)]
pub struct DeletedNode<'a> {
    /// Path of the tombstone the query was answered from.
    pub tombstone: &'a NodePath,
    /// The node at the requested path inside the tombstone subtree, if the
    /// subtree had one when it was deleted.
    pub node: Option<&'a ConfigurationNode>,
}

/// The merged tree plus its tombstones
#[derive(Debug, Clone)]
pub struct ConfigurationTree {
    nodes: Vec<ConfigurationNode>,
    deleted_nodes: BTreeMap<NodePath, NodeId>,
    deleted_properties: BTreeMap<String, ConfigurationProperty>,
}

impl Default for ConfigurationTree {
    fn default() -> Self {
        Self {
            nodes: vec![ConfigurationNode::new(PathSegment::root(), None)],
            deleted_nodes: BTreeMap::new(),
            deleted_properties: BTreeMap::new(),
        }
    }
}

impl ConfigurationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root(&self) -> &ConfigurationNode {
        &self.nodes[0]
    }

    /// Get any node of the arena, live or deleted.
    pub fn node(&self, id: NodeId) -> Option<&ConfigurationNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut ConfigurationNode> {
        self.nodes.get_mut(id.0)
    }

    pub(crate) fn push_node(&mut self, segment: PathSegment, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(ConfigurationNode::new(segment, Some(parent)));
        id
    }

    /// Number of nodes reachable from the root, root included.
    pub fn live_node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root_id()];
        while let Some(id) = stack.pop() {
            count += 1;
            if let Some(node) = self.node(id) {
                stack.extend(node.children.values().copied());
            }
        }
        count
    }

    /// Path of a node, computed from its parent links.
    pub fn path_of(&self, id: NodeId) -> NodePath {
        let mut segments = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            if node.parent.is_none() {
                break;
            }
            segments.push(node.segment.clone());
            current = node.parent.and_then(|p| self.node(p));
        }
        let mut path = NodePath::root();
        for segment in segments.into_iter().rev() {
            path = path.child(segment);
        }
        path
    }

    /// Current path of the property `name` of node `id`.
    pub fn property_path_of(&self, id: NodeId, name: &str) -> String {
        property_path(&self.path_of(id), name)
    }

    /// True if the node is reachable from the root.
    pub fn is_live(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let Some(node) = self.node(current) else {
                return false;
            };
            if node.deleted {
                return false;
            }
            match node.parent {
                None => return current == self.root_id(),
                Some(parent) => current = parent,
            }
        }
    }

    /// Follow `segments` down from `start`.
    pub fn descend(&self, start: NodeId, segments: &[PathSegment]) -> Option<NodeId> {
        let mut current = start;
        for segment in segments {
            let node = self.node(current)?;
            current = *node.children.get(&segment.force_index().to_string())?;
        }
        Some(current)
    }

    /// Look up a live node by path.
    pub fn resolve(&self, path: &NodePath) -> Option<NodeId> {
        self.descend(self.root_id(), path.segments())
    }

    pub fn resolve_node(&self, path: &NodePath) -> Option<&ConfigurationNode> {
        self.resolve(path).and_then(|id| self.node(id))
    }

    /// Look up a live property by absolute path, e.g. `/a/b/prop`.
    pub fn resolve_property(&self, path: &str) -> Option<&ConfigurationProperty> {
        let (node_path, name) = split_property_path(path)?;
        self.resolve_node(&node_path)?.property(name)
    }

    /// Deleted nodes by the path they had when deleted.
    pub fn deleted_nodes(&self) -> impl Iterator<Item = (&NodePath, &ConfigurationNode)> {
        self.deleted_nodes
            .iter()
            .filter_map(|(path, id)| self.node(*id).map(|node| (path, node)))
    }

    /// Deleted properties by the path they had when deleted.
    pub fn deleted_properties(&self) -> &BTreeMap<String, ConfigurationProperty> {
        &self.deleted_properties
    }

    pub(crate) fn record_deleted_node(&mut self, path: NodePath, id: NodeId) {
        self.deleted_nodes.insert(path, id);
    }

    pub(crate) fn record_deleted_property(&mut self, path: String, property: ConfigurationProperty) {
        self.deleted_properties.insert(path, property);
    }

    /// Answer "was `path` explicitly deleted?".
    ///
    /// Finds the tombstone with the longest path that is `path` or one of its
    /// ancestors, then walks its subtree down to `path`. `None` means no
    /// tombstone covers the path, i.e. it was never deleted.
    pub fn find_deleted_node(&self, path: &NodePath) -> Option<DeletedNode<'_>> {
        let (tombstone, id) = self
            .deleted_nodes
            .iter()
            .filter(|(deleted, _)| path.starts_with(deleted))
            .max_by_key(|(deleted, _)| deleted.depth())?;

        let rest = path.relative_to(tombstone).unwrap_or_default();
        let node = self.descend(*id, rest).and_then(|found| self.node(found));
        Some(DeletedNode { tombstone, node })
    }

    /// Find a deleted property, either recorded on its own or inside a
    /// deleted node.
    pub fn find_deleted_property(&self, path: &str) -> Option<&ConfigurationProperty> {
        let (node_path, name) = split_property_path(path)?;
        if let Some(property) = self.deleted_properties.get(&property_path(&node_path, name)) {
            return Some(property);
        }
        self.find_deleted_node(&node_path)?.node?.property(name)
    }
}

/// Split `/a/b/prop` into the node path `/a/b` and the name `prop`.
pub fn split_property_path(path: &str) -> Option<(NodePath, &str)> {
    let (parent, name) = path.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    let parent = if parent.is_empty() { "/" } else { parent };
    Some((NodePath::parse(parent).ok()?, name))
}
