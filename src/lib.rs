//! # hconf
//!
//! This library compiles many independently authored *modules* of declarative
//! configuration fragments into one merged configuration tree. It is used by
//! the `hconf` command-line tool but works just as well embedded in other
//! applications that assemble modules in code.
//!
//! ## Quick Example
//!
//! ```
//! use hconf::definition::{Definition, TreeDefinition, Value};
//! use hconf::model::ConfigurationModel;
//! use hconf::module::{Module, Source, SourceKind};
//!
//! let mut tree = TreeDefinition::parse("/config").unwrap();
//! tree.root_mut()
//!     .add_node("app")
//!     .unwrap()
//!     .add_property("title", Value::string("Hello"))
//!     .unwrap();
//!
//! let module = Module::named("base", "app", "defaults")
//!     .with_source(
//!         Source::new("main.yaml", SourceKind::Config).with_definition(Definition::Config(tree)),
//!     )
//!     .unwrap();
//!
//! let mut model = ConfigurationModel::new();
//! model.add_module(module);
//! model.build().unwrap();
//!
//! let title = model.resolve_property("/config/app/title").unwrap();
//! assert_eq!(title.value().unwrap().text(), "Hello");
//! ```
//!
//! ## Core Concepts
//!
//! - **Paths (`path`)**: node names with same-name-sibling indices (`foo[2]`)
//!   and absolute node paths.
//! - **Ordering (`ordering`, `hierarchy`)**: modules live in projects, groups
//!   and sites. Every level is sorted by declared `after` dependencies, which
//!   fixes the order in which modules are merged.
//! - **Definitions (`definition`, `module`)**: a module owns sources; each
//!   source holds namespace, config, content and web file bundle definitions.
//! - **Merge (`merge`)**: config definitions are folded into one tree, with
//!   provenance, tombstones for explicit deletions and same-name-sibling
//!   renumbering.
//! - **Model (`model`)**: runs ordering and merge and answers queries.
//! - **Manifest (`manifest`)**: a canonical per-module listing of content
//!   digests, hashed into one digest per scope.
//! - **Loading (`loader`, `resource`)**: reads modules from disk and gives
//!   the digest pass access to referenced resource files.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: find module descriptors and parse their fragments.
//! 2.  **Sort**: order sites, groups, projects and modules.
//! 3.  **Merge**: push each module's config definitions, in order, into the
//!     merged tree.
//! 4.  **Digest** (optional): compute the manifest and digest of a scope.

pub mod definition;
pub mod error;
pub mod hierarchy;
pub mod loader;
pub mod manifest;
pub mod merge;
pub mod model;
pub mod module;
pub mod ordering;
pub mod path;
pub mod resource;

#[cfg(test)]
mod path_proptest;
