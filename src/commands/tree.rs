//! # Tree Command Implementation
//!
//! This module implements the `tree` subcommand, which displays the merged
//! configuration tree in a hierarchical format.
//!
//! ## Functionality
//!
//! - **Subtree selection**: `--path` starts the display at any node
//! - **Depth control**: `--depth` limits how many levels are shown
//! - **Properties**: each node lists its properties with their values
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::{Context, Result};
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::borrow::Cow;
use std::path::PathBuf;

use hconf::definition::PropertyKind;
use hconf::merge::{ConfigurationNode, ConfigurationProperty, ConfigurationTree, NodeId};
use hconf::path::NodePath;

/// Display the merged configuration tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Directory to search for module descriptors.
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Node to start from.
    #[arg(long, value_name = "PATH", default_value = "/")]
    pub path: String,

    /// Maximum depth to display in the tree.
    ///
    /// If not specified, displays the full tree.
    /// Use 0 to show only the starting node.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `tree` command.
pub fn execute(args: TreeArgs) -> Result<()> {
    let model = super::load(&args.root)?;
    let path = NodePath::parse(&args.path)
        .with_context(|| format!("Invalid node path '{}'", args.path))?;
    let tree = model.tree();
    let start = tree
        .resolve(&path)
        .with_context(|| format!("No node at {}", path))?;

    let root = build_tree_node(tree, start, args.depth.unwrap_or(usize::MAX), 0);
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Build a display node for `id` and, depth permitting, its subtree.
fn build_tree_node(
    tree: &ConfigurationTree,
    id: NodeId,
    max_depth: usize,
    current_depth: usize,
) -> TreeNode {
    let Some(node) = tree.node(id) else {
        return TreeNode::leaf(format!("<missing {:?}>", id));
    };

    let mut children: Vec<TreeNode> = node
        .properties()
        .map(|property| TreeNode::leaf(property_label(property)))
        .collect();
    if current_depth < max_depth {
        children.extend(
            node.children()
                .map(|(_, child)| build_tree_node(tree, child, max_depth, current_depth + 1)),
        );
    }

    TreeNode {
        label: node_label(node),
        children,
    }
}

fn node_label(node: &ConfigurationNode) -> String {
    let mut label = if node.parent().is_none() {
        "/".to_string()
    } else {
        node.name()
    };
    if let Some(target) = node.pending_order_before() {
        label.push_str(&format!(" (pending order-before '{}')", target));
    }
    label
}

fn property_label(property: &ConfigurationProperty) -> String {
    let values = property
        .values()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    match property.kind() {
        PropertyKind::Single => format!(
            "{} = {} ({})",
            property.name(),
            values.first().map(String::as_str).unwrap_or_default(),
            property.value_type()
        ),
        PropertyKind::List => format!(
            "{} = [{}] ({})",
            property.name(),
            values.join(", "),
            property.value_type()
        ),
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: String) -> Self {
        TreeNode {
            label,
            children: vec![],
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
