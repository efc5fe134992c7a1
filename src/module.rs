//! # Modules and Sources
//!
//! A [`Module`] is the unit of contribution: it owns an ordered set of
//! [`Source`]s (one per fragment file), each holding a list of
//! [`Definition`]s. [`Module::build`] partitions the definitions of all
//! sources by kind and checks the per-module invariants:
//!
//! - namespace definitions come from a single source;
//! - config and content definitions have unique root paths, except below the
//!   shared translations subtree where several definitions may meet.
//!
//! Config and content definitions are ordered by root path so that a parent
//! is always merged before the definitions rooted below it.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::definition::{BundleDefinition, Definition, NamespaceDefinition, TreeDefinition};
use crate::error::{Error, Result};
use crate::hierarchy::CORE_SITE;
use crate::ordering::Orderable;
use crate::path::NodePath;
use crate::resource::{MemoryResources, ResourceProvider};

/// File name of the module descriptor, relative to the module root.
pub const DESCRIPTOR_FILE: &str = "hcm-module.yaml";
/// File name of the actions log, relative to the module root.
pub const ACTIONS_FILE: &str = "hcm-actions.yaml";
/// Folder holding config sources and their resources.
pub const CONFIG_FOLDER: &str = "hcm-config";
/// Folder holding content sources.
pub const CONTENT_FOLDER: &str = "hcm-content";
/// Root of the subtree that several modules may define at the same path.
pub const TRANSLATIONS_ROOT: &str = "/hippo:configuration/hippo:translations";

/// Which folder a source lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Config,
    Content,
}

impl SourceKind {
    pub fn folder(&self) -> &'static str {
        match self {
            SourceKind::Config => CONFIG_FOLDER,
            SourceKind::Content => CONTENT_FOLDER,
        }
    }
}

/// One fragment file of a module
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    path: String,
    kind: SourceKind,
    raw: String,
    definitions: Vec<Definition>,
}

impl Source {
    /// `path` is relative to the config or content folder, e.g. `main.yaml`.
    pub fn new(path: &str, kind: SourceKind) -> Self {
        Self {
            path: path.trim_start_matches('/').to_string(),
            kind,
            raw: String::new(),
            definitions: Vec::new(),
        }
    }

    /// Keep the fragment text the source was parsed from.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn add_definition(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }
}

/// Name plus `after` dependencies of one hierarchy level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coordinate {
    pub name: String,
    pub after: BTreeSet<String>,
}

impl Coordinate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            after: BTreeSet::new(),
        }
    }

    pub fn after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Position of a definition inside a module: source index, definition index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DefinitionRef {
    source: usize,
    definition: usize,
}

/// A module of configuration fragments
#[derive(Clone)]
pub struct Module {
    coordinate: Coordinate,
    group: Coordinate,
    project: Coordinate,
    site: Option<String>,
    hst_root: Option<String>,
    descriptor: Option<String>,
    actions: Option<String>,
    sources: Vec<Source>,
    config_resources: Arc<dyn ResourceProvider>,
    content_resources: Arc<dyn ResourceProvider>,
    namespace_definitions: Vec<DefinitionRef>,
    config_definitions: Vec<DefinitionRef>,
    content_definitions: Vec<DefinitionRef>,
    bundle_definitions: Vec<DefinitionRef>,
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.full_name())
            .field("after", &self.coordinate.after)
            .field("site", &self.site)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl Module {
    pub fn new(group: Coordinate, project: Coordinate, module: Coordinate) -> Self {
        Self {
            coordinate: module,
            group,
            project,
            site: None,
            hst_root: None,
            descriptor: None,
            actions: None,
            sources: Vec::new(),
            config_resources: Arc::new(MemoryResources::new()),
            content_resources: Arc::new(MemoryResources::new()),
            namespace_definitions: Vec::new(),
            config_definitions: Vec::new(),
            content_definitions: Vec::new(),
            bundle_definitions: Vec::new(),
        }
    }

    /// Shorthand for a module without any `after` dependencies.
    pub fn named(group: &str, project: &str, module: &str) -> Self {
        Self::new(
            Coordinate::new(group),
            Coordinate::new(project),
            Coordinate::new(module),
        )
    }

    /// Assign the module to a site; `None` keeps it in core.
    pub fn with_site(mut self, site: Option<&str>) -> Self {
        self.site = site
            .filter(|s| !s.is_empty() && *s != CORE_SITE)
            .map(str::to_string);
        self
    }

    pub fn with_hst_root(mut self, hst_root: impl Into<String>) -> Self {
        self.hst_root = Some(hst_root.into());
        self
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    pub fn with_actions(mut self, actions: impl Into<String>) -> Self {
        self.actions = Some(actions.into());
        self
    }

    pub fn with_config_resources(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.config_resources = provider;
        self
    }

    pub fn with_content_resources(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.content_resources = provider;
        self
    }

    pub fn with_source(mut self, source: Source) -> Result<Self> {
        self.add_source(source)?;
        Ok(self)
    }

    /// Add a source. Source paths are unique within a module and folder.
    pub fn add_source(&mut self, source: Source) -> Result<()> {
        if self
            .sources
            .iter()
            .any(|s| s.path == source.path && s.kind == source.kind)
        {
            return Err(Error::DuplicateSource {
                module: self.full_name(),
                source_path: source.path,
            });
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.coordinate.name
    }

    /// The module's own name and `after` set.
    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    /// `group/project/module`
    pub fn full_name(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.name, self.project.name, self.coordinate.name
        )
    }

    pub fn group(&self) -> &Coordinate {
        &self.group
    }

    pub fn project(&self) -> &Coordinate {
        &self.project
    }

    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    pub fn hst_root(&self) -> Option<&str> {
        self.hst_root.as_deref()
    }

    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    pub fn actions(&self) -> Option<&str> {
        self.actions.as_deref()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn config_resources(&self) -> &dyn ResourceProvider {
        self.config_resources.as_ref()
    }

    pub fn content_resources(&self) -> &dyn ResourceProvider {
        self.content_resources.as_ref()
    }

    /// Partition the definitions of all sources and validate them.
    pub fn build(&mut self) -> Result<()> {
        self.namespace_definitions.clear();
        self.config_definitions.clear();
        self.content_definitions.clear();
        self.bundle_definitions.clear();

        let mut namespace_source: Option<usize> = None;
        for (source_index, source) in self.sources.iter().enumerate() {
            for (definition_index, definition) in source.definitions.iter().enumerate() {
                let reference = DefinitionRef {
                    source: source_index,
                    definition: definition_index,
                };
                match definition {
                    Definition::Namespace(_) => {
                        match namespace_source {
                            Some(first) if first != source_index => {
                                return Err(Error::MultipleNamespaceSources {
                                    module: self.full_name(),
                                    first: self.sources[first].path.clone(),
                                    second: source.path.clone(),
                                });
                            }
                            _ => namespace_source = Some(source_index),
                        }
                        self.namespace_definitions.push(reference);
                    }
                    Definition::Config(_) => self.config_definitions.push(reference),
                    Definition::Content(_) => self.content_definitions.push(reference),
                    Definition::Bundle(_) => self.bundle_definitions.push(reference),
                }
            }
        }

        let mut config = std::mem::take(&mut self.config_definitions);
        self.sort_by_root(&mut config)?;
        self.config_definitions = config;

        let mut content = std::mem::take(&mut self.content_definitions);
        self.sort_by_root(&mut content)?;
        self.content_definitions = content;
        Ok(())
    }

    /// Stable sort by root path, rejecting two definitions on one root.
    fn sort_by_root(&self, references: &mut [DefinitionRef]) -> Result<()> {
        references.sort_by(|a, b| self.root_path(*a).cmp(&self.root_path(*b)));

        let translations = NodePath::parse(TRANSLATIONS_ROOT)?;
        for pair in references.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let (root, other) = (self.root_path(first), self.root_path(second));
            if let (Some(root), Some(other)) = (root, other) {
                if root == other && !root.starts_with(&translations) {
                    return Err(Error::DuplicateDefinitionRoot {
                        module: self.full_name(),
                        root: root.to_string(),
                        first: self.sources[first.source].path.clone(),
                        second: self.sources[second.source].path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn definition(&self, reference: DefinitionRef) -> Option<&Definition> {
        self.sources
            .get(reference.source)
            .and_then(|s| s.definitions.get(reference.definition))
    }

    fn root_path(&self, reference: DefinitionRef) -> Option<&NodePath> {
        self.definition(reference)
            .and_then(Definition::as_tree)
            .map(TreeDefinition::root_path)
    }

    fn resolve(&self, reference: DefinitionRef) -> Option<(&Source, &Definition)> {
        let source = self.sources.get(reference.source)?;
        let definition = source.definitions.get(reference.definition)?;
        Some((source, definition))
    }

    /// Namespace definitions, in source order. Valid after [`Module::build`].
    pub fn namespace_definitions(
        &self,
    ) -> impl Iterator<Item = (&Source, &NamespaceDefinition)> + '_ {
        self.namespace_definitions
            .iter()
            .filter_map(|r| match self.resolve(*r)? {
                (source, Definition::Namespace(ns)) => Some((source, ns)),
                _ => None,
            })
    }

    /// Config definitions, ordered by root path. Valid after [`Module::build`].
    pub fn config_definitions(&self) -> impl Iterator<Item = (&Source, &TreeDefinition)> + '_ {
        self.config_definitions
            .iter()
            .filter_map(|r| match self.resolve(*r)? {
                (source, Definition::Config(tree)) => Some((source, tree)),
                _ => None,
            })
    }

    /// Content definitions, ordered by root path. Valid after [`Module::build`].
    pub fn content_definitions(&self) -> impl Iterator<Item = (&Source, &TreeDefinition)> + '_ {
        self.content_definitions
            .iter()
            .filter_map(|r| match self.resolve(*r)? {
                (source, Definition::Content(tree)) => Some((source, tree)),
                _ => None,
            })
    }

    /// Web file bundle definitions. Valid after [`Module::build`].
    pub fn bundle_definitions(&self) -> impl Iterator<Item = (&Source, &BundleDefinition)> + '_ {
        self.bundle_definitions
            .iter()
            .filter_map(|r| match self.resolve(*r)? {
                (source, Definition::Bundle(bundle)) => Some((source, bundle)),
                _ => None,
            })
    }
}

impl Orderable for Module {
    fn name(&self) -> &str {
        &self.coordinate.name
    }

    fn after(&self) -> &BTreeSet<String> {
        &self.coordinate.after
    }
}
