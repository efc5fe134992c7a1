//! # Manifest and Digest
//!
//! A manifest lists, per module, every item that contributes to the merged
//! model together with a content digest:
//!
//! | item path                     | value                                 |
//! |-------------------------------|---------------------------------------|
//! | `/hcm-module.yaml`            | digest of the descriptor              |
//! | `/hcm-actions.yaml`           | digest of the actions log             |
//! | `/hcm-config/<source>`        | digest of the source text             |
//! | `/hcm-config/<resource>`      | digest of a referenced resource       |
//! | `/hcm-content/<source>`       | root path of the content definition   |
//!
//! A module without a descriptor gets one synthesized from its coordinates,
//! and a module without an actions log gets an empty one, so every entry is
//! always defined. Content is listed by target path only.
//!
//! Manifests are ordered by module key, then by item path, and serialized to
//! a canonical text whose SHA-256 is the digest of the scope.

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use log::debug;
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::definition::{Definition, DefinitionNode, Value};
use crate::error::{Error, Result};
use crate::hierarchy::CORE_SITE;
use crate::loader::ModuleDescriptor;
use crate::module::{Module, Source, SourceKind, ACTIONS_FILE, DESCRIPTOR_FILE};
use crate::resource::resolve_resource_path;

/// Actions log used for modules that do not ship one.
pub const DEFAULT_ACTIONS: &str = "action-lists: []\n";

/// Which part of a model a digest covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Modules without a site.
    Core,
    /// Core modules plus the modules of one site.
    Site(String),
}

impl Scope {
    /// `core` (or an empty name) selects [`Scope::Core`].
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() || name == CORE_SITE {
            Scope::Core
        } else {
            Scope::Site(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Scope::Core => CORE_SITE,
            Scope::Site(name) => name,
        }
    }

    /// Whether `module` contributes to this scope.
    pub fn includes(&self, module: &Module) -> bool {
        match (self, module.site()) {
            (_, None) => true,
            (Scope::Site(name), Some(site)) => name == site,
            (Scope::Core, Some(_)) => false,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Item path → digest, per module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    modules: BTreeMap<String, BTreeMap<String, String>>,
}

impl Manifest {
    /// Compute the manifest of `modules`. Modules are digested in parallel.
    pub fn compute<'a>(modules: impl IntoIterator<Item = &'a Module>) -> Result<Self> {
        let modules: Vec<&Module> = modules.into_iter().collect();
        let entries = modules
            .par_iter()
            .map(|module| Ok((module_key(module), module_manifest(module)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        debug!("computed manifest of {} module(s)", entries.len());
        Ok(Self { modules: entries })
    }

    pub fn modules(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// SHA-256 of the canonical text, hex encoded.
    pub fn digest(&self) -> String {
        digest_bytes(self.to_string().as_bytes())
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (module, items) in &self.modules {
            writeln!(f, "{}:", module)?;
            for (path, digest) in items {
                writeln!(f, "    {} -> {}", path, digest)?;
            }
        }
        Ok(())
    }
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Site modules are keyed `site:group/project/module` so that equally named
/// modules of different sites never collide.
fn module_key(module: &Module) -> String {
    match module.site() {
        Some(site) => format!("{}:{}", site, module.full_name()),
        None => module.full_name(),
    }
}

/// The manifest entries of one module.
pub fn module_manifest(module: &Module) -> Result<BTreeMap<String, String>> {
    let mut items = BTreeMap::new();

    let descriptor = match module.descriptor() {
        Some(text) => text.to_string(),
        None => ModuleDescriptor::from_module(module).to_yaml()?,
    };
    items.insert(format!("/{}", DESCRIPTOR_FILE), digest_bytes(descriptor.as_bytes()));
    items.insert(
        format!("/{}", ACTIONS_FILE),
        digest_bytes(module.actions().unwrap_or(DEFAULT_ACTIONS).as_bytes()),
    );

    for source in module.sources() {
        let folder = source.kind().folder();
        match source.kind() {
            SourceKind::Config => {
                items.insert(
                    format!("/{}/{}", folder, source.path()),
                    digest_bytes(source.raw().as_bytes()),
                );
                for value in config_resources(source) {
                    let path = format!(
                        "/{}{}",
                        folder,
                        resolve_resource_path(source.path(), value.text())
                    );
                    let digest = resource_digest(module, source, value)?;
                    items.insert(path, digest);
                }
            }
            SourceKind::Content => {
                for definition in source.definitions() {
                    if let Definition::Content(tree) = definition {
                        items.insert(
                            format!("/{}/{}", folder, source.path()),
                            tree.root_path().to_string(),
                        );
                    }
                }
            }
        }
    }
    Ok(items)
}

/// Resource values referenced from the config definitions of `source`.
fn config_resources(source: &Source) -> Vec<&Value> {
    let mut values = Vec::new();
    for definition in source.definitions() {
        match definition {
            Definition::Config(tree) => collect_resources(tree.root(), &mut values),
            Definition::Namespace(namespace) => {
                values.extend(namespace.cnd.iter().filter(|cnd| cnd.is_resource()))
            }
            Definition::Content(_) | Definition::Bundle(_) => {}
        }
    }
    values
}

fn collect_resources<'a>(node: &'a DefinitionNode, values: &mut Vec<&'a Value>) {
    for property in node.properties() {
        values.extend(property.values().iter().filter(|value| value.is_resource()));
    }
    for child in node.nodes() {
        collect_resources(child, values);
    }
}

fn resource_digest(module: &Module, source: &Source, value: &Value) -> Result<String> {
    if let Some(bytes) = value.bytes() {
        return Ok(digest_bytes(bytes));
    }

    let provider = module.config_resources();
    if !provider.has_resource(source, value.text()) {
        return Err(Error::ResourceNotFound {
            module: module.full_name(),
            source_path: source.path().to_string(),
            path: value.text().to_string(),
        });
    }

    let digest_error = |message: String| Error::Digest {
        module: module.full_name(),
        path: resolve_resource_path(source.path(), value.text()),
        message,
    };
    let mut reader = provider
        .open_resource(source, value.text())
        .map_err(|e| digest_error(e.to_string()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| digest_error(e.to_string()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{TreeDefinition, ValueType};
    use crate::resource::MemoryResources;
    use std::sync::Arc;

    fn module_with_resource(bytes: Option<&[u8]>) -> Module {
        let mut tree = TreeDefinition::parse("/a").unwrap();
        let mut value = Value::resource(ValueType::Binary, "data.bin");
        if let Some(bytes) = bytes {
            value = value.with_bytes(bytes.to_vec());
        }
        tree.root_mut().add_property("data", value).unwrap();
        Module::named("g", "p", "m")
            .with_source(
                Source::new("sub/main.yaml", SourceKind::Config)
                    .with_raw("definitions: {}\n")
                    .with_definition(Definition::Config(tree)),
            )
            .unwrap()
    }

    #[test]
    fn test_scope_names() {
        assert_eq!(Scope::from_name("core"), Scope::Core);
        assert_eq!(Scope::from_name(""), Scope::Core);
        assert_eq!(Scope::from_name("web").to_string(), "web");

        let site_module = Module::named("g", "p", "m").with_site(Some("web"));
        assert!(!Scope::Core.includes(&site_module));
        assert!(Scope::from_name("web").includes(&site_module));
        assert!(!Scope::from_name("other").includes(&site_module));
        assert!(Scope::from_name("other").includes(&Module::named("g", "p", "m")));
    }

    #[test]
    fn test_defaults_are_synthesized() {
        let items = module_manifest(&Module::named("g", "p", "m")).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items["/hcm-actions.yaml"],
            digest_bytes(DEFAULT_ACTIONS.as_bytes())
        );
        assert!(items.contains_key("/hcm-module.yaml"));
    }

    #[test]
    fn test_resource_is_read_through_provider() {
        let resources = MemoryResources::new().with_file("sub/data.bin", "payload");
        let module = module_with_resource(None).with_config_resources(Arc::new(resources));
        let items = module_manifest(&module).unwrap();
        assert_eq!(
            items["/hcm-config/sub/data.bin"],
            digest_bytes(b"payload")
        );
        assert!(items.contains_key("/hcm-config/sub/main.yaml"));
    }

    #[test]
    fn test_loaded_bytes_skip_the_provider() {
        let module = module_with_resource(Some(b"payload"));
        let items = module_manifest(&module).unwrap();
        assert_eq!(
            items["/hcm-config/sub/data.bin"],
            digest_bytes(b"payload")
        );
    }

    #[test]
    fn test_missing_resource_is_a_clean_error() {
        let err = module_manifest(&module_with_resource(None)).unwrap_err();
        match err {
            Error::ResourceNotFound { module, path, .. } => {
                assert_eq!(module, "g/p/m");
                assert_eq!(path, "data.bin");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_content_is_listed_by_path() {
        let module = Module::named("g", "p", "m")
            .with_source(
                Source::new("home.yaml", SourceKind::Content).with_definition(
                    Definition::Content(TreeDefinition::parse("/content/home").unwrap()),
                ),
            )
            .unwrap();
        let items = module_manifest(&module).unwrap();
        assert_eq!(items["/hcm-content/home.yaml"], "/content/home");
    }

    #[test]
    fn test_manifest_text() {
        let module = Module::named("g", "p", "m")
            .with_descriptor("group: g\nproject: p\nmodule: m\n")
            .with_actions("action-lists: []\n");
        let manifest = Manifest::compute([&module]).unwrap();
        insta::assert_snapshot!(manifest.to_string(), @r"
        g/p/m:
            /hcm-actions.yaml -> 9e8527934195adcb0200353a83b88cb664c90461eb7e121645e9c6031146def4
            /hcm-module.yaml -> 4f24d816e3799c531a35f7fa04f4be01c9e1a3e9df89a37a5707751dd722026d
        ");
    }
}
