//! # Configuration Model
//!
//! [`ConfigurationModel`] is the top-level aggregate. Modules are added to it,
//! then [`ConfigurationModel::build`] runs the two passes:
//!
//! 1.  **Ordering**: sort the site/group/project/module hierarchy and build
//!     every module.
//! 2.  **Merge**: push the config definitions of every module, core modules
//!     first, into one [`ConfigurationTree`], and collect the namespace,
//!     content and bundle definitions in the same order.
//!
//! Building again after adding more modules recompiles everything from the
//! hierarchy. Building again without adding anything does nothing.
//!
//! Once built, the model answers path queries and computes digests.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::definition::{BundleDefinition, NamespaceDefinition, TreeDefinition};
use crate::error::{Error, Result};
use crate::hierarchy::Hierarchy;
use crate::manifest::{Manifest, Scope};
use crate::merge::{
    ConfigurationNode, ConfigurationProperty, ConfigurationTree, ConfigurationTreeBuilder,
    DeletedNode,
};
use crate::module::Module;
use crate::path::NodePath;

/// A definition together with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition<T> {
    /// Full name of the contributing module.
    pub module: String,
    /// Source path inside the module.
    pub source: String,
    pub definition: T,
}

/// The compiled result of a set of modules
#[derive(Debug, Clone, Default)]
pub struct ConfigurationModel {
    hierarchy: Hierarchy,
    dirty: bool,
    tree: ConfigurationTree,
    namespaces: Vec<ModelDefinition<NamespaceDefinition>>,
    content: Vec<ModelDefinition<TreeDefinition>>,
    bundles: Vec<ModelDefinition<BundleDefinition>>,
    sites: BTreeMap<String, String>,
}

impl ConfigurationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. Takes effect on the next [`ConfigurationModel::build`].
    pub fn add_module(&mut self, module: Module) -> &mut Self {
        self.hierarchy.add_module(module);
        self.dirty = true;
        self
    }

    /// Add deep copies of every module of `other`.
    pub fn add_modules_from(&mut self, other: &ConfigurationModel) -> &mut Self {
        for module in other.modules() {
            self.add_module(module.clone());
        }
        self
    }

    /// Sort, build and merge.
    ///
    /// A failed build leaves the model unusable until it is rebuilt.
    pub fn build(&mut self) -> Result<()> {
        if !self.dirty {
            debug!("model is up to date");
            return Ok(());
        }

        self.hierarchy.sort()?;
        for module in self.hierarchy.modules_mut() {
            module.build()?;
        }

        let mut builder = ConfigurationTreeBuilder::new();
        let mut namespaces = Vec::new();
        let mut content = Vec::new();
        let mut bundles = Vec::new();
        let mut sites = BTreeMap::new();

        for module in self.hierarchy.modules() {
            let name = module.full_name();
            if let Some(site) = module.site() {
                if module.namespace_definitions().next().is_some() {
                    return Err(Error::NamespaceInSiteModule {
                        module: name,
                        site: site.to_string(),
                    });
                }
                record_site(&mut sites, site, module);
            }

            for (source, definition) in module.config_definitions() {
                builder.push_definition(&name, source.path(), definition)?;
            }
            builder.finish_module()?;

            namespaces.extend(
                module
                    .namespace_definitions()
                    .map(|(source, ns)| entry(&name, source.path(), ns)),
            );
            content.extend(
                module
                    .content_definitions()
                    .map(|(source, tree)| entry(&name, source.path(), tree)),
            );
            bundles.extend(
                module
                    .bundle_definitions()
                    .map(|(source, bundle)| entry(&name, source.path(), bundle)),
            );
        }

        for site in self.hierarchy.site_names() {
            sites
                .entry(site.to_string())
                .or_insert_with(|| default_hst_root(site));
        }

        self.tree = builder.build();
        self.namespaces = namespaces;
        self.content = content;
        self.bundles = bundles;
        self.sites = sites;
        self.dirty = false;

        info!(
            "built model: {} module(s), {} node(s), {} deleted node(s)",
            self.hierarchy.module_count(),
            self.tree.live_node_count(),
            self.tree.deleted_nodes().count()
        );
        Ok(())
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Modules in merge order (once built).
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.hierarchy.modules()
    }

    pub fn tree(&self) -> &ConfigurationTree {
        &self.tree
    }

    pub fn root(&self) -> &ConfigurationNode {
        self.tree.root()
    }

    /// Look up a live node by absolute path, e.g. `/a/b[2]`.
    pub fn resolve_node(&self, path: &str) -> Option<&ConfigurationNode> {
        self.tree.resolve_node(&NodePath::parse(path).ok()?)
    }

    /// Look up a live property by absolute path, e.g. `/a/b/prop`.
    pub fn resolve_property(&self, path: &str) -> Option<&ConfigurationProperty> {
        self.tree.resolve_property(path)
    }

    /// Tell "explicitly deleted" apart from "never defined" for `path`.
    pub fn find_deleted_node(&self, path: &str) -> Option<DeletedNode<'_>> {
        self.tree.find_deleted_node(&NodePath::parse(path).ok()?)
    }

    pub fn find_deleted_property(&self, path: &str) -> Option<&ConfigurationProperty> {
        self.tree.find_deleted_property(path)
    }

    pub fn namespace_definitions(&self) -> &[ModelDefinition<NamespaceDefinition>] {
        &self.namespaces
    }

    pub fn content_definitions(&self) -> &[ModelDefinition<TreeDefinition>] {
        &self.content
    }

    pub fn bundle_definitions(&self) -> &[ModelDefinition<BundleDefinition>] {
        &self.bundles
    }

    /// Non-core site names mapped to their site root.
    pub fn sites(&self) -> &BTreeMap<String, String> {
        &self.sites
    }

    /// The content definition with the longest root path that is `path` or
    /// one of its ancestors.
    pub fn content_definition_for(&self, path: &str) -> Option<&ModelDefinition<TreeDefinition>> {
        let path = NodePath::parse(path).ok()?;
        self.content
            .iter()
            .filter(|entry| path.starts_with(entry.definition.root_path()))
            .max_by_key(|entry| entry.definition.root_path().depth())
    }

    /// The manifest of one scope.
    pub fn manifest(&self, scope: &Scope) -> Result<Manifest> {
        if let Scope::Site(name) = scope {
            if !self.hierarchy.site_names().any(|site| site == name) {
                return Err(Error::Hierarchy {
                    message: format!("unknown site '{}'", name),
                });
            }
        }
        Manifest::compute(self.modules().filter(|module| scope.includes(module)))
    }

    /// The digest of one scope.
    pub fn digest(&self, scope: &Scope) -> Result<String> {
        Ok(self.manifest(scope)?.digest())
    }

    /// Digests of the core scope and of every site, keyed by scope name.
    pub fn digests(&self) -> Result<BTreeMap<String, String>> {
        let mut scopes = vec![Scope::Core];
        scopes.extend(self.hierarchy.site_names().map(Scope::from_name));
        scopes
            .into_iter()
            .map(|scope| Ok((scope.name().to_string(), self.digest(&scope)?)))
            .collect()
    }

    /// Whether both models declare the same sites with equal digests.
    pub fn digests_equal(&self, other: &ConfigurationModel) -> Result<bool> {
        Ok(self.digests()? == other.digests()?)
    }
}

fn entry<T: Clone>(module: &str, source: &str, definition: &T) -> ModelDefinition<T> {
    ModelDefinition {
        module: module.to_string(),
        source: source.to_string(),
        definition: definition.clone(),
    }
}

fn default_hst_root(site: &str) -> String {
    format!("/hst:{}", site)
}

/// Remember the site root declared by `module`; the first declaration wins.
fn record_site(sites: &mut BTreeMap<String, String>, site: &str, module: &Module) {
    let Some(hst_root) = module.hst_root() else {
        return;
    };
    match sites.get(site) {
        Some(existing) if existing != hst_root => warn!(
            "site '{}' root {} declared by {} is ignored, keeping {}",
            site,
            hst_root,
            module.full_name(),
            existing
        ),
        Some(_) => {}
        None => {
            sites.insert(site.to_string(), hst_root.to_string());
        }
    }
}
