//! # Definitions
//!
//! A *definition* is one declarative unit contributed by a module source. This
//! module holds the definition kinds and the node/property forest that config
//! and content definitions carry.
//!
//! ## Key Components
//!
//! - **`Definition`**: sum type over the four kinds: namespace, config,
//!   content and web file bundle.
//! - **`DefinitionNode`**: one node of a definition forest. Children are kept
//!   in insertion order and keyed by their indexed name (`foo[1]`), so `foo`
//!   and `foo[1]` address the same child.
//! - **`DefinitionProperty`**: a single- or multi-valued property together
//!   with the [`PropertyOperation`] that says how it merges with what earlier
//!   modules defined.
//! - **`Value`**: a typed value in textual form. A value can point at an
//!   external resource file, which is read lazily through the owning module's
//!   resource provider.
//!
//! Definitions are immutable once a fragment has been parsed. The merge
//! algorithm only reads them.

use std::fmt;
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::path::{NodePath, PathSegment};

/// Property value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
    WeakReference,
    Uri,
    Decimal,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Binary => "binary",
            ValueType::Long => "long",
            ValueType::Double => "double",
            ValueType::Date => "date",
            ValueType::Boolean => "boolean",
            ValueType::Name => "name",
            ValueType::Path => "path",
            ValueType::Reference => "reference",
            ValueType::WeakReference => "weakreference",
            ValueType::Uri => "uri",
            ValueType::Decimal => "decimal",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        let value_type = match name.to_ascii_lowercase().as_str() {
            "string" => ValueType::String,
            "binary" => ValueType::Binary,
            "long" => ValueType::Long,
            "double" => ValueType::Double,
            "date" => ValueType::Date,
            "boolean" => ValueType::Boolean,
            "name" => ValueType::Name,
            "path" => ValueType::Path,
            "reference" => ValueType::Reference,
            "weakreference" => ValueType::WeakReference,
            "uri" => ValueType::Uri,
            "decimal" => ValueType::Decimal,
            _ => return None,
        };
        Some(value_type)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a tree item
///
/// Only `Config` items are owned by the merge engine. The others are recorded
/// as overrides so that consumers know which children to leave alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Config,
    Content,
    Runtime,
    System,
}

impl Category {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "config" => Some(Category::Config),
            "content" => Some(Category::Content),
            "runtime" => Some(Category::Runtime),
            "system" => Some(Category::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Config => "config",
            Category::Content => "content",
            Category::Runtime => "runtime",
            Category::System => "system",
        }
    }
}

/// A typed value in textual form
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    value_type: ValueType,
    text: String,
    resource: bool,
    path: bool,
    bytes: Option<Arc<[u8]>>,
}

impl Value {
    pub fn new(value_type: ValueType, text: impl Into<String>) -> Self {
        Self {
            value_type,
            text: text.into(),
            resource: false,
            path: false,
            bytes: None,
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::new(ValueType::String, text)
    }

    /// A value whose content lives in a resource file next to its source.
    ///
    /// `location` is relative to the source file, or to the module's config
    /// root when it starts with `/`.
    pub fn resource(value_type: ValueType, location: impl Into<String>) -> Self {
        Self {
            resource: true,
            ..Self::new(value_type, location)
        }
    }

    /// A value that names another node by path instead of by identifier.
    pub fn path_reference(value_type: ValueType, node_path: impl Into<String>) -> Self {
        Self {
            path: true,
            ..Self::new(value_type, node_path)
        }
    }

    /// Attach already loaded resource data.
    pub fn with_bytes(mut self, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.bytes = Some(bytes.into());
        self
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The literal text, or the resource location for resource values.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_resource(&self) -> bool {
        self.resource
    }

    pub fn is_path(&self) -> bool {
        self.path
    }

    /// Resource data that was loaded together with the value, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.resource {
            write!(f, "resource:{}", self.text)
        } else if self.path {
            write!(f, "path:{}", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

/// Single- or multi-valued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Single,
    List,
}

/// How a property definition merges with the value already in the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PropertyOperation {
    /// Replace the existing value(s).
    #[default]
    Replace,
    /// Append to the existing values.
    Add,
    /// Append the values not already present.
    Combine,
    /// Remove the property.
    Delete,
}

impl PropertyOperation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "replace" => Some(PropertyOperation::Replace),
            "add" => Some(PropertyOperation::Add),
            "combine" => Some(PropertyOperation::Combine),
            "delete" => Some(PropertyOperation::Delete),
            _ => None,
        }
    }
}

/// One property of a definition node
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionProperty {
    name: String,
    path: String,
    kind: PropertyKind,
    value_type: ValueType,
    values: Vec<Value>,
    operation: PropertyOperation,
    category: Option<Category>,
}

impl DefinitionProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path: the owning node's path plus the property name.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn operation(&self) -> PropertyOperation {
        self.operation
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn set_operation(&mut self, operation: PropertyOperation) -> &mut Self {
        self.operation = operation;
        self
    }

    pub fn set_category(&mut self, category: Category) -> &mut Self {
        self.category = Some(category);
        self
    }
}

/// One node of a definition forest
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionNode {
    segment: PathSegment,
    path: NodePath,
    delete: bool,
    order_before: Option<String>,
    category: Option<Category>,
    residual_child_node_category: Option<Category>,
    nodes: IndexMap<String, DefinitionNode>,
    properties: IndexMap<String, DefinitionProperty>,
}

impl DefinitionNode {
    /// Create a definition root at an absolute path.
    pub fn new(path: NodePath) -> Self {
        Self {
            segment: path.last(),
            path,
            delete: false,
            order_before: None,
            category: None,
            residual_child_node_category: None,
            nodes: IndexMap::new(),
            properties: IndexMap::new(),
        }
    }

    /// The node name as written (index 0 when none was given).
    pub fn segment(&self) -> &PathSegment {
        &self.segment
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn is_delete(&self) -> bool {
        self.delete
    }

    pub fn order_before(&self) -> Option<&str> {
        self.order_before.as_deref()
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn residual_child_node_category(&self) -> Option<Category> {
        self.residual_child_node_category
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DefinitionNode> {
        self.nodes.values()
    }

    pub fn properties(&self) -> impl Iterator<Item = &DefinitionProperty> {
        self.properties.values()
    }

    pub fn node(&self, name: &str) -> Option<&DefinitionNode> {
        let key = PathSegment::parse(name).ok()?.force_index().to_string();
        self.nodes.get(&key)
    }

    pub fn property(&self, name: &str) -> Option<&DefinitionProperty> {
        self.properties.get(name)
    }

    /// Get or create the child `name` (`foo` or `foo[2]`).
    pub fn add_node(&mut self, name: &str) -> Result<&mut DefinitionNode> {
        self.ensure_not_deleted(name)?;
        let segment = PathSegment::parse(name)?;
        let key = segment.force_index().to_string();
        let path = self.path.child(segment);
        Ok(self
            .nodes
            .entry(key)
            .or_insert_with(|| DefinitionNode::new(path)))
    }

    /// Add or replace a single-valued property.
    pub fn add_property(&mut self, name: &str, value: Value) -> Result<&mut DefinitionProperty> {
        let value_type = value.value_type();
        self.insert_property(name, PropertyKind::Single, value_type, vec![value])
    }

    /// Add or replace a multi-valued property.
    pub fn add_list_property(
        &mut self,
        name: &str,
        value_type: ValueType,
        values: Vec<Value>,
    ) -> Result<&mut DefinitionProperty> {
        self.insert_property(name, PropertyKind::List, value_type, values)
    }

    /// Declare that the property `name` is to be removed.
    pub fn delete_property(&mut self, name: &str) -> Result<&mut DefinitionProperty> {
        let property =
            self.insert_property(name, PropertyKind::Single, ValueType::String, Vec::new())?;
        property.operation = PropertyOperation::Delete;
        Ok(property)
    }

    /// Turn this node into a deletion marker.
    ///
    /// A deleted node carries nothing else: children, properties and any
    /// `order-before` are dropped.
    pub fn mark_deleted(&mut self) -> &mut Self {
        self.delete = true;
        self.nodes.clear();
        self.properties.clear();
        self.order_before = None;
        self
    }

    /// Move this node before the sibling `target`; an empty name moves it first.
    pub fn set_order_before(&mut self, target: impl Into<String>) -> Result<&mut Self> {
        self.ensure_not_deleted(".meta:order-before")?;
        self.order_before = Some(target.into());
        Ok(self)
    }

    pub fn set_category(&mut self, category: Category) -> &mut Self {
        self.category = Some(category);
        self
    }

    pub fn set_residual_child_node_category(&mut self, category: Category) -> &mut Self {
        self.residual_child_node_category = Some(category);
        self
    }

    fn insert_property(
        &mut self,
        name: &str,
        kind: PropertyKind,
        value_type: ValueType,
        values: Vec<Value>,
    ) -> Result<&mut DefinitionProperty> {
        self.ensure_not_deleted(name)?;
        if name.is_empty() || name.contains('/') || name.contains('[') {
            return Err(Error::InvalidPathSegment {
                text: name.to_string(),
                message: "property names must be plain names".to_string(),
            });
        }
        let property = DefinitionProperty {
            name: name.to_string(),
            path: property_path(&self.path, name),
            kind,
            value_type,
            values,
            operation: PropertyOperation::Replace,
            category: None,
        };
        Ok(match self.properties.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let slot = entry.into_mut();
                *slot = property;
                slot
            }
            Entry::Vacant(entry) => entry.insert(property),
        })
    }

    fn ensure_not_deleted(&self, item: &str) -> Result<()> {
        if self.delete {
            return Err(Error::InvalidPath {
                path: self.path.to_string(),
                message: format!("a deleted node cannot define '{}'", item),
            });
        }
        Ok(())
    }
}

/// Absolute path of property `name` on the node at `node`.
pub fn property_path(node: &NodePath, name: &str) -> String {
    if node.is_root() {
        format!("/{}", name)
    } else {
        format!("{}/{}", node, name)
    }
}

/// Namespace registration
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDefinition {
    pub prefix: String,
    pub uri: String,
    /// Optional node type definitions shipped as a resource.
    pub cnd: Option<Value>,
}

/// A config or content definition: a node forest rooted at one path
#[derive(Debug, Clone, PartialEq)]
pub struct TreeDefinition {
    root: DefinitionNode,
}

impl TreeDefinition {
    pub fn new(root_path: NodePath) -> Self {
        Self {
            root: DefinitionNode::new(root_path),
        }
    }

    pub fn parse(root_path: &str) -> Result<Self> {
        Ok(Self::new(NodePath::parse(root_path)?))
    }

    pub fn root_path(&self) -> &NodePath {
        self.root.path()
    }

    pub fn root(&self) -> &DefinitionNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut DefinitionNode {
        &mut self.root
    }
}

/// A named bundle of web files served by the delivery tier
#[derive(Debug, Clone, PartialEq)]
pub struct BundleDefinition {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Namespace,
    Config,
    Content,
    Bundle,
}

/// One definition of a source
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Namespace(NamespaceDefinition),
    Config(TreeDefinition),
    Content(TreeDefinition),
    Bundle(BundleDefinition),
}

impl Definition {
    pub fn kind(&self) -> DefinitionKind {
        match self {
            Definition::Namespace(_) => DefinitionKind::Namespace,
            Definition::Config(_) => DefinitionKind::Config,
            Definition::Content(_) => DefinitionKind::Content,
            Definition::Bundle(_) => DefinitionKind::Bundle,
        }
    }

    pub fn as_tree(&self) -> Option<&TreeDefinition> {
        match self {
            Definition::Config(tree) | Definition::Content(tree) => Some(tree),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names() {
        assert_eq!(ValueType::from_name("WeakReference"), Some(ValueType::WeakReference));
        assert_eq!(ValueType::from_name("long").map(|t| t.as_str()), Some("long"));
        assert_eq!(ValueType::from_name("blob"), None);
    }

    #[test]
    fn test_add_node_addresses_first_sibling_both_ways() {
        let mut def = TreeDefinition::parse("/a").unwrap();
        def.root_mut().add_node("foo").unwrap();
        def.root_mut().add_node("foo[1]").unwrap().add_property("p", Value::string("v")).unwrap();
        assert_eq!(def.root().nodes().count(), 1);
        let foo = def.root().node("foo").unwrap();
        assert_eq!(foo.path().to_string(), "/a/foo");
        assert_eq!(foo.property("p").unwrap().path(), "/a/foo/p");
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut def = TreeDefinition::parse("/").unwrap();
        for name in ["c", "a", "b[2]", "b"] {
            def.root_mut().add_node(name).unwrap();
        }
        let names: Vec<String> = def.root().nodes().map(|n| n.segment().to_string()).collect();
        assert_eq!(names, vec!["c", "a", "b[2]", "b"]);
        assert_eq!(def.root().node("c").unwrap().path().to_string(), "/c");
    }

    #[test]
    fn test_mark_deleted_clears_content() {
        let mut def = TreeDefinition::parse("/a").unwrap();
        let root = def.root_mut();
        root.add_node("child").unwrap();
        root.add_property("p", Value::string("v")).unwrap();
        root.set_order_before("x").unwrap();
        root.mark_deleted();

        assert!(root.is_delete());
        assert_eq!(root.nodes().count(), 0);
        assert_eq!(root.properties().count(), 0);
        assert!(root.order_before().is_none());
        assert!(root.add_node("again").is_err());
    }

    #[test]
    fn test_property_names_are_validated() {
        let mut def = TreeDefinition::parse("/a").unwrap();
        assert!(def.root_mut().add_property("x/y", Value::string("v")).is_err());
        assert!(def.root_mut().add_property("x[1]", Value::string("v")).is_err());
    }

    #[test]
    fn test_delete_property_sets_operation() {
        let mut def = TreeDefinition::parse("/a").unwrap();
        def.root_mut().delete_property("gone").unwrap();
        let property = def.root().property("gone").unwrap();
        assert_eq!(property.operation(), PropertyOperation::Delete);
        assert!(property.values().is_empty());
    }

    #[test]
    fn test_resource_values() {
        let value = Value::resource(ValueType::Binary, "data/logo.png").with_bytes(vec![1u8, 2, 3]);
        assert!(value.is_resource());
        assert_eq!(value.bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(value.to_string(), "resource:data/logo.png");
    }

    #[test]
    fn test_root_property_path() {
        assert_eq!(property_path(&NodePath::root(), "p"), "/p");
    }
}
