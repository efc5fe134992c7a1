//! Folding config definitions into the merged tree
//!
//! [`ConfigurationTreeBuilder`] receives definitions module by module, in the
//! order fixed by the hierarchy sort. Each definition node is applied
//! top-down:
//!
//! 1.  **Resolve**: find the merged node by indexed name under the merged
//!     parent, creating it if needed. Creating `foo[3]` requires `foo[2]`.
//! 2.  **Provenance**: record the definition item, unless it is the item that
//!     was recorded last. Re-applying a definition is therefore harmless.
//! 3.  **Delete**: unlink the node, renumber its same-name siblings and keep
//!     it as a tombstone under its path. A later deletion of the same path
//!     replaces the tombstone.
//! 4.  **Order**: move the node before its `order-before` sibling. When that
//!     sibling does not exist yet the node is moved to the end, the request
//!     stays pending on the node and is retried when a module finishes.
//! 5.  **Properties**: replace, add, combine or delete.
//! 6.  **Categories**: record category overrides together with their origin.
//! 7.  **Recurse** into child definitions.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, warn};

use super::{
    CategoryOverride, ConfigurationNode, ConfigurationProperty, ConfigurationTree, ItemOrigin,
    NodeId,
};
use crate::definition::{
    Category, DefinitionNode, DefinitionProperty, PropertyKind, PropertyOperation,
    TreeDefinition, Value,
};
use crate::error::{Error, Result};
use crate::path::PathSegment;

/// Where a moved node goes among its siblings
#[derive(Debug, Clone, Copy)]
enum Placement {
    First,
    Before(NodeId),
    Last,
}

/// Module and source a definition is being pushed from
struct PushContext<'a> {
    module: &'a str,
    source: &'a str,
}

impl PushContext<'_> {
    fn origin(&self, path: String) -> ItemOrigin {
        ItemOrigin {
            module: self.module.to_string(),
            source: self.source.to_string(),
            path,
        }
    }
}

/// Incrementally builds a [`ConfigurationTree`]
#[derive(Debug, Default)]
pub struct ConfigurationTreeBuilder {
    tree: ConfigurationTree,
    pending: Vec<NodeId>,
}

impl ConfigurationTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tree as built so far.
    pub fn tree(&self) -> &ConfigurationTree {
        &self.tree
    }

    /// Apply one config definition of `module`'s `source`.
    pub fn push_definition(
        &mut self,
        module: &str,
        source: &str,
        definition: &TreeDefinition,
    ) -> Result<()> {
        let context = PushContext { module, source };
        let root = definition.root();
        let root_path = root.path();
        debug!("merging {} from {} [{}]", root_path, module, source);

        let Some(parent_path) = root_path.parent() else {
            if root.is_delete() {
                return Err(self.resolution_error(root, &context, "the root node cannot be deleted"));
            }
            let root_id = self.tree.root_id();
            return self.merge_content(None, root_id, root, &context);
        };

        match self.tree.resolve(&parent_path) {
            Some(parent) => self.merge_node(parent, root, &context),
            None if root.is_delete() => {
                warn!(
                    "{} is deleted by {} [{}] but its parent {} does not exist",
                    root_path, module, source, parent_path
                );
                Ok(())
            }
            None => Err(self.resolution_error(
                root,
                &context,
                &format!("parent node {} does not exist", parent_path),
            )),
        }
    }

    /// Barrier between modules: retry every pending `order-before`.
    pub fn finish_module(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for id in pending {
            if !self.tree.is_live(id) {
                continue;
            }
            let target = self
                .tree
                .node(id)
                .and_then(|node| node.pending_order_before.clone());
            if let Some(target) = target {
                self.order_before(id, &target)?;
            }
        }
        Ok(())
    }

    /// Finish building and hand out the tree.
    ///
    /// `order-before` requests whose target never appeared stay recorded on
    /// their nodes.
    pub fn build(self) -> ConfigurationTree {
        for id in &self.pending {
            if let Some(node) = self.tree.node(*id) {
                debug!(
                    "order-before target '{}' of {} was never defined",
                    node.pending_order_before.as_deref().unwrap_or_default(),
                    self.tree.path_of(*id)
                );
            }
        }
        self.tree
    }

    fn merge_node(
        &mut self,
        parent: NodeId,
        definition: &DefinitionNode,
        context: &PushContext<'_>,
    ) -> Result<()> {
        let segment = definition.segment().force_index();
        let existing = self
            .node(parent)?
            .children
            .get(&segment.to_string())
            .copied();

        if definition.is_delete() {
            match existing {
                Some(id) => {
                    let origin = context.origin(definition.path().to_string());
                    append_origin(&mut self.node_mut(id)?.definitions, origin);
                    self.delete_node(parent, id)?;
                }
                None => warn!(
                    "{} is deleted by {} [{}] but does not exist",
                    definition.path(),
                    context.module,
                    context.source
                ),
            }
            return Ok(());
        }

        let id = match existing {
            Some(id) => id,
            None => self.create_node(parent, segment, definition, context)?,
        };
        self.merge_content(Some(parent), id, definition, context)
    }

    fn merge_content(
        &mut self,
        parent: Option<NodeId>,
        id: NodeId,
        definition: &DefinitionNode,
        context: &PushContext<'_>,
    ) -> Result<()> {
        let origin = context.origin(definition.path().to_string());
        append_origin(&mut self.node_mut(id)?.definitions, origin.clone());

        if let Some(target) = definition.order_before() {
            self.order_before(id, target)?;
        }
        for property in definition.properties() {
            self.merge_property(id, property, context)?;
        }
        self.apply_categories(parent, id, definition, &origin)?;
        for child in definition.nodes() {
            self.merge_node(id, child, context)?;
        }
        Ok(())
    }

    fn create_node(
        &mut self,
        parent: NodeId,
        segment: PathSegment,
        definition: &DefinitionNode,
        context: &PushContext<'_>,
    ) -> Result<NodeId> {
        let siblings = self
            .node(parent)?
            .children
            .values()
            .filter_map(|child| self.tree.node(*child))
            .filter(|child| child.segment.name() == segment.name())
            .count();
        if segment.index() > siblings + 1 {
            return Err(self.resolution_error(
                definition,
                context,
                &format!(
                    "cannot create same-name sibling {} when only {} node(s) named '{}' exist",
                    segment,
                    siblings,
                    segment.name()
                ),
            ));
        }

        let key = segment.to_string();
        let id = self.tree.push_node(segment, parent);
        self.node_mut(parent)?.children.insert(key, id);
        Ok(id)
    }

    fn order_before(&mut self, id: NodeId, target: &str) -> Result<()> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Ok(());
        };

        if target.is_empty() {
            self.clear_pending(id)?;
            return self.place(parent, id, Placement::First);
        }

        let target_key = PathSegment::parse(target)?.force_index().to_string();
        if target_key == node.segment.to_string() {
            return self.clear_pending(id);
        }

        match self.node(parent)?.children.get(&target_key).copied() {
            Some(target_id) => {
                self.clear_pending(id)?;
                self.place(parent, id, Placement::Before(target_id))
            }
            None => {
                if node.pending_order_before.as_deref() == Some(target) {
                    return Ok(());
                }
                debug!(
                    "order-before target '{}' of {} does not exist yet",
                    target,
                    self.tree.path_of(id)
                );
                self.node_mut(id)?.pending_order_before = Some(target.to_string());
                if !self.pending.contains(&id) {
                    self.pending.push(id);
                }
                self.place(parent, id, Placement::Last)
            }
        }
    }

    fn clear_pending(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.pending_order_before = None;
        self.pending.retain(|pending| *pending != id);
        Ok(())
    }

    /// Move `id` within `parent`'s children and renumber.
    fn place(&mut self, parent: NodeId, id: NodeId, placement: Placement) -> Result<()> {
        let mut order: Vec<NodeId> = self
            .node(parent)?
            .children
            .values()
            .copied()
            .filter(|child| *child != id)
            .collect();
        let position = match placement {
            Placement::First => 0,
            Placement::Before(target) => order
                .iter()
                .position(|child| *child == target)
                .unwrap_or(order.len()),
            Placement::Last => order.len(),
        };
        order.insert(position, id);
        self.renumber(parent, order)
    }

    fn delete_node(&mut self, parent: NodeId, id: NodeId) -> Result<()> {
        let path = self.tree.path_of(id);
        let remaining: Vec<NodeId> = self
            .node(parent)?
            .children
            .values()
            .copied()
            .filter(|child| *child != id)
            .collect();
        self.renumber(parent, remaining)?;

        self.node_mut(id)?.deleted = true;
        debug!("deleted {}", path);
        self.tree.record_deleted_node(path, id);
        self.pending.retain(|pending| self.tree.is_live(*pending));
        Ok(())
    }

    /// Rebuild `parent`'s children in `order`, numbering same-name siblings
    /// 1..N in that order.
    fn renumber(&mut self, parent: NodeId, order: Vec<NodeId>) -> Result<()> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut children = IndexMap::with_capacity(order.len());
        for child in order {
            let node = self.node_mut(child)?;
            let count = counts.entry(node.segment.name().to_string()).or_insert(0);
            *count += 1;
            node.segment = node.segment.with_index(*count)?;
            children.insert(node.segment.to_string(), child);
        }
        self.node_mut(parent)?.children = children;
        Ok(())
    }

    fn merge_property(
        &mut self,
        id: NodeId,
        definition: &DefinitionProperty,
        context: &PushContext<'_>,
    ) -> Result<()> {
        let origin = context.origin(definition.path().to_string());
        let path = self.tree.property_path_of(id, definition.name());

        if definition.operation() == PropertyOperation::Delete {
            let removed = self.node_mut(id)?.properties.shift_remove(definition.name());
            match removed {
                Some(mut property) => {
                    property.deleted = true;
                    append_origin(&mut property.definitions, origin);
                    self.tree.record_deleted_property(path, property);
                }
                None => warn!("{} is deleted by {} but does not exist", path, origin),
            }
            return Ok(());
        }

        let node = self.node_mut(id)?;
        let property = node
            .properties
            .entry(definition.name().to_string())
            .or_insert_with(|| ConfigurationProperty {
                name: definition.name().to_string(),
                kind: definition.kind(),
                value_type: definition.value_type(),
                values: Vec::new(),
                definitions: Vec::new(),
                deleted: false,
            });

        if property.kind != definition.kind() || property.value_type != definition.value_type() {
            warn!(
                "{} changes from {} {:?} to {} {:?} in {}",
                path,
                property.value_type,
                property.kind,
                definition.value_type(),
                definition.kind(),
                origin
            );
            property.kind = definition.kind();
            property.value_type = definition.value_type();
            property.values = definition.values().to_vec();
        } else {
            merge_values(
                &mut property.values,
                property.kind,
                definition.values(),
                definition.operation(),
            );
        }
        append_origin(&mut property.definitions, origin);
        Ok(())
    }

    fn apply_categories(
        &mut self,
        parent: Option<NodeId>,
        id: NodeId,
        definition: &DefinitionNode,
        origin: &ItemOrigin,
    ) -> Result<()> {
        if let (Some(parent), Some(category)) = (parent, definition.category()) {
            let name = definition.segment().name().to_string();
            let node = self.node_mut(parent)?;
            set_override(&mut node.child_node_categories, name, category, origin);
        }

        let node = self.node_mut(id)?;
        if let Some(category) = definition.residual_child_node_category() {
            if let Some(previous) = &node.residual_child_node_category {
                warn_conflict("residual child node category", previous, category, origin);
            }
            node.residual_child_node_category = Some(CategoryOverride {
                category,
                origin: origin.clone(),
            });
        }
        for property in definition.properties() {
            if let Some(category) = property.category() {
                set_override(
                    &mut node.child_property_categories,
                    property.name().to_string(),
                    category,
                    origin,
                );
            }
        }
        Ok(())
    }

    fn node(&self, id: NodeId) -> Result<&ConfigurationNode> {
        self.tree.node(id).ok_or_else(|| dangling(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ConfigurationNode> {
        self.tree.node_mut(id).ok_or_else(|| dangling(id))
    }

    fn resolution_error(
        &self,
        definition: &DefinitionNode,
        context: &PushContext<'_>,
        message: &str,
    ) -> Error {
        Error::NodeResolution {
            path: definition.path().to_string(),
            origin: context.origin(definition.path().to_string()).to_string(),
            message: message.to_string(),
        }
    }
}

fn dangling(id: NodeId) -> Error {
    Error::NodeResolution {
        path: format!("{:?}", id),
        origin: "merged tree".to_string(),
        message: "node id does not exist".to_string(),
    }
}

fn append_origin(definitions: &mut Vec<ItemOrigin>, origin: ItemOrigin) {
    if definitions.last() != Some(&origin) {
        definitions.push(origin);
    }
}

fn merge_values(
    existing: &mut Vec<Value>,
    kind: PropertyKind,
    incoming: &[Value],
    operation: PropertyOperation,
) {
    match (kind, operation) {
        (PropertyKind::List, PropertyOperation::Add) => existing.extend(incoming.iter().cloned()),
        (PropertyKind::List, PropertyOperation::Combine) => {
            for value in incoming {
                if !existing.contains(value) {
                    existing.push(value.clone());
                }
            }
        }
        _ => *existing = incoming.to_vec(),
    }
}

fn set_override(
    overrides: &mut std::collections::BTreeMap<String, CategoryOverride>,
    name: String,
    category: Category,
    origin: &ItemOrigin,
) {
    if let Some(previous) = overrides.get(&name) {
        warn_conflict(&format!("category of '{}'", name), previous, category, origin);
    }
    overrides.insert(
        name,
        CategoryOverride {
            category,
            origin: origin.clone(),
        },
    );
}

fn warn_conflict(what: &str, previous: &CategoryOverride, category: Category, origin: &ItemOrigin) {
    if previous.category != category && previous.origin.module != origin.module {
        warn!(
            "{} set to {} by {} is overridden with {} by {}",
            what,
            previous.category.as_str(),
            previous.origin,
            category.as_str(),
            origin
        );
    }
}
