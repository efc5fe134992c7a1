//! # YAML Module Loader
//!
//! Reads modules from disk and turns their YAML fragments into [`Module`]s.
//!
//! A module is any directory holding an `hcm-module.yaml` descriptor. Config
//! sources are the `*.yaml` files below `hcm-config/`, content sources the
//! ones below `hcm-content/`. Every other file under `hcm-config/` is a
//! resource that values may reference.
//!
//! ## Fragment syntax
//!
//! ```yaml
//! definitions:
//!   namespace:
//!     - prefix: myns
//!       uri: http://example.com/myns/1.0
//!   config:
//!     /a/b:
//!       prop: value
//!       list: [x, y]
//!       typed: { type: long, value: 42 }
//!       appended: { operation: add, value: [z] }
//!       .meta:order-before: c
//!       /child:
//!         .meta:delete: true
//!   webfilebundle: site
//! ```
//!
//! Keys starting with `/` are child nodes, keys starting with `.meta:` are
//! node metadata, everything else is a property.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as YamlValue};
use walkdir::WalkDir;

use crate::definition::{
    BundleDefinition, Category, Definition, DefinitionNode, NamespaceDefinition,
    PropertyOperation, TreeDefinition, Value, ValueType,
};
use crate::error::{Error, Result};
use crate::model::ConfigurationModel;
use crate::module::{
    Coordinate, Module, Source, SourceKind, ACTIONS_FILE, CONFIG_FOLDER, CONTENT_FOLDER,
    DESCRIPTOR_FILE,
};
use crate::resource::DirectoryResources;

const META_PREFIX: &str = ".meta:";

/// Contents of `hcm-module.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub group: CoordinateSpec,
    pub project: CoordinateSpec,
    pub module: CoordinateSpec,
}

/// One level of a descriptor, written either as a plain name or as a mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CoordinateForm")]
pub struct CoordinateSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, rename = "hst-root", skip_serializing_if = "Option::is_none")]
    pub hst_root: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoordinateForm {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        after: OneOrMany,
        #[serde(default)]
        site: Option<String>,
        #[serde(default, rename = "hst-root")]
        hst_root: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl From<CoordinateForm> for CoordinateSpec {
    fn from(form: CoordinateForm) -> Self {
        match form {
            CoordinateForm::Name(name) => CoordinateSpec {
                name,
                ..Default::default()
            },
            CoordinateForm::Full {
                name,
                after,
                site,
                hst_root,
            } => CoordinateSpec {
                name,
                after: match after {
                    OneOrMany::One(name) => vec![name],
                    OneOrMany::Many(names) => names,
                },
                site,
                hst_root,
            },
        }
    }
}

impl CoordinateSpec {
    fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.name).after(self.after.iter().cloned())
    }

    fn from_coordinate(coordinate: &Coordinate) -> Self {
        CoordinateSpec {
            name: coordinate.name.clone(),
            after: coordinate.after.iter().cloned().collect(),
            ..Default::default()
        }
    }
}

impl ModuleDescriptor {
    /// Parse descriptor text. `file` is only used in error messages.
    pub fn parse(file: &str, text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| {
            parse_error(
                file,
                e.to_string(),
                Some("a descriptor needs 'group', 'project' and 'module' entries"),
            )
        })
    }

    /// Describe an existing module, e.g. one assembled in code.
    pub fn from_module(module: &Module) -> Self {
        let mut spec = CoordinateSpec::from_coordinate(module.coordinate());
        spec.site = module.site().map(str::to_string);
        spec.hst_root = module.hst_root().map(str::to_string);
        ModuleDescriptor {
            group: CoordinateSpec::from_coordinate(module.group()),
            project: CoordinateSpec::from_coordinate(module.project()),
            module: spec,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// An empty module for this descriptor.
    pub fn to_module(&self) -> Module {
        let mut module = Module::new(
            self.group.coordinate(),
            self.project.coordinate(),
            self.module.coordinate(),
        )
        .with_site(self.module.site.as_deref());
        if let Some(hst_root) = &self.module.hst_root {
            module = module.with_hst_root(hst_root.clone());
        }
        module
    }
}

/// Load every module below `root` into a model and build it.
pub fn load_model(root: &Path) -> Result<ConfigurationModel> {
    let mut model = ConfigurationModel::new();
    for module in load_modules(root)? {
        model.add_module(module);
    }
    model.build()?;
    Ok(model)
}

/// Find and load every module below `root`, in path order.
pub fn load_modules(root: &Path) -> Result<Vec<Module>> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            name != CONFIG_FOLDER && name != CONTENT_FOLDER
        });

    let mut modules = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == DESCRIPTOR_FILE {
            if let Some(module_root) = entry.path().parent() {
                modules.push(load_module(module_root)?);
            }
        }
    }
    debug!("found {} module(s) below {}", modules.len(), root.display());
    Ok(modules)
}

/// Load the module whose descriptor sits in `root`.
pub fn load_module(root: &Path) -> Result<Module> {
    let descriptor_path = root.join(DESCRIPTOR_FILE);
    let descriptor_text = fs::read_to_string(&descriptor_path)?;
    let descriptor =
        ModuleDescriptor::parse(&descriptor_path.display().to_string(), &descriptor_text)?;

    let config_root = root.join(CONFIG_FOLDER);
    let content_root = root.join(CONTENT_FOLDER);
    let mut module = descriptor
        .to_module()
        .with_descriptor(descriptor_text)
        .with_config_resources(Arc::new(DirectoryResources::new(&config_root)))
        .with_content_resources(Arc::new(DirectoryResources::new(&content_root)));

    let actions_path = root.join(ACTIONS_FILE);
    if actions_path.is_file() {
        module = module.with_actions(fs::read_to_string(&actions_path)?);
    }

    for (relative, path) in yaml_files(&config_root)? {
        let text = fs::read_to_string(&path)?;
        module.add_source(parse_config_source(&relative, &text)?)?;
    }
    for (relative, path) in yaml_files(&content_root)? {
        let text = fs::read_to_string(&path)?;
        module.add_source(parse_content_source(&relative, &text)?)?;
    }

    debug!(
        "loaded module {} with {} source(s)",
        module.full_name(),
        module.sources().len()
    );
    Ok(module)
}

/// YAML files below `folder` as (`/`-separated relative path, full path).
fn yaml_files(folder: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !folder.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry?;
        let is_yaml = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if !entry.file_type().is_file() || !is_yaml {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(folder)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.path().to_path_buf()));
    }
    Ok(files)
}

/// Parse a config fragment into a source at `path` (relative to `hcm-config`).
pub fn parse_config_source(path: &str, text: &str) -> Result<Source> {
    let mut source = Source::new(path, SourceKind::Config).with_raw(text);
    let document: YamlValue =
        serde_yaml::from_str(text).map_err(|e| parse_error(path, e.to_string(), None))?;
    if document.is_null() {
        return Ok(source);
    }

    let top = as_mapping(path, &document, "the document")?;
    let definitions = top.get("definitions").ok_or_else(|| {
        parse_error(
            path,
            "missing 'definitions' entry",
            Some("config sources start with a 'definitions' mapping"),
        )
    })?;
    if definitions.is_null() {
        return Ok(source);
    }

    for (key, value) in as_mapping(path, definitions, "'definitions'")? {
        match key_str(path, key)? {
            "namespace" => {
                for item in as_sequence(path, value, "'namespace'")? {
                    source.add_definition(Definition::Namespace(parse_namespace(path, item)?));
                }
            }
            "config" => {
                for (root, node) in as_mapping(path, value, "'config'")? {
                    let mut tree = TreeDefinition::parse(key_str(path, root)?)?;
                    parse_node(path, tree.root_mut(), node)?;
                    source.add_definition(Definition::Config(tree));
                }
            }
            "webfilebundle" => {
                source.add_definition(Definition::Bundle(BundleDefinition {
                    name: scalar_text(path, value, "'webfilebundle'")?,
                }));
            }
            other => {
                return Err(parse_error(
                    path,
                    format!("unknown definition type '{}'", other),
                    Some("expected 'namespace', 'config' or 'webfilebundle'"),
                ))
            }
        }
    }
    Ok(source)
}

/// Parse a content fragment: a single root path mapped to a node.
pub fn parse_content_source(path: &str, text: &str) -> Result<Source> {
    let document: YamlValue =
        serde_yaml::from_str(text).map_err(|e| parse_error(path, e.to_string(), None))?;
    let top = as_mapping(path, &document, "the document")?;
    let mut entries = top.iter();
    let (Some((root, node)), None) = (entries.next(), entries.next()) else {
        return Err(parse_error(
            path,
            "content sources must have exactly one root path",
            None,
        ));
    };

    let mut tree = TreeDefinition::parse(key_str(path, root)?)?;
    parse_node(path, tree.root_mut(), node)?;
    Ok(Source::new(path, SourceKind::Content)
        .with_raw(text)
        .with_definition(Definition::Content(tree)))
}

fn parse_namespace(file: &str, item: &YamlValue) -> Result<NamespaceDefinition> {
    let mapping = as_mapping(file, item, "a namespace")?;
    let field = |name: &str| -> Result<Option<String>> {
        mapping
            .get(name)
            .map(|value| scalar_text(file, value, name))
            .transpose()
    };
    let missing = |name: &str| {
        parse_error(
            file,
            format!("namespace is missing '{}'", name),
            Some("namespaces need 'prefix' and 'uri'"),
        )
    };
    Ok(NamespaceDefinition {
        prefix: field("prefix")?.ok_or_else(|| missing("prefix"))?,
        uri: field("uri")?.ok_or_else(|| missing("uri"))?,
        cnd: field("cnd")?.map(|cnd| Value::resource(ValueType::String, cnd)),
    })
}

fn parse_node(file: &str, node: &mut DefinitionNode, value: &YamlValue) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    let what = node.path().to_string();
    let mapping = as_mapping(file, value, &what)?;

    let delete = match mapping.get(".meta:delete") {
        Some(flag) => flag.as_bool().ok_or_else(|| {
            parse_error(file, format!("'.meta:delete' of {} must be a boolean", what), None)
        })?,
        None => false,
    };
    if delete {
        if mapping.len() > 1 {
            return Err(parse_error(
                file,
                format!("{} is deleted and cannot define anything else", what),
                Some("remove the other entries or the '.meta:delete' flag"),
            ));
        }
        node.mark_deleted();
        return Ok(());
    }

    for (key, item) in mapping {
        let key = key_str(file, key)?;
        if let Some(child) = key.strip_prefix('/') {
            parse_node(file, node.add_node(child)?, item)?;
            continue;
        }
        match key {
            ".meta:delete" => {}
            ".meta:order-before" => {
                let target = if item.is_null() {
                    String::new()
                } else {
                    scalar_text(file, item, key)?
                };
                node.set_order_before(target)?;
            }
            ".meta:category" => {
                node.set_category(parse_category(file, item)?);
            }
            ".meta:residual-child-node-category" => {
                node.set_residual_child_node_category(parse_category(file, item)?);
            }
            meta if meta.starts_with(META_PREFIX) => {
                return Err(parse_error(
                    file,
                    format!("unknown metadata key '{}' on {}", meta, what),
                    None,
                ))
            }
            name => parse_property(file, node, name, item)?,
        }
    }
    Ok(())
}

fn parse_property(
    file: &str,
    node: &mut DefinitionNode,
    name: &str,
    item: &YamlValue,
) -> Result<()> {
    let Some(mapping) = item.as_mapping() else {
        return add_values(
            file,
            node,
            name,
            item,
            None,
            ValueForm::Literal,
            PropertyOperation::Replace,
            None,
        );
    };

    let operation = match mapping.get("operation") {
        Some(op) => {
            let text = scalar_text(file, op, "operation")?;
            PropertyOperation::from_name(&text).ok_or_else(|| {
                parse_error(
                    file,
                    format!("unknown operation '{}' on property '{}'", text, name),
                    Some("expected replace, add, combine or delete"),
                )
            })?
        }
        None => PropertyOperation::Replace,
    };
    let category = mapping
        .get(".meta:category")
        .map(|c| parse_category(file, c))
        .transpose()?;

    if operation == PropertyOperation::Delete {
        let property = node.delete_property(name)?;
        if let Some(category) = category {
            property.set_category(category);
        }
        return Ok(());
    }

    let value_type = mapping
        .get("type")
        .map(|t| {
            let text = scalar_text(file, t, "type")?;
            ValueType::from_name(&text).ok_or_else(|| {
                parse_error(file, format!("unknown value type '{}'", text), None)
            })
        })
        .transpose()?;

    let forms = [
        ("value", ValueForm::Literal),
        ("resource", ValueForm::Resource),
        ("path", ValueForm::Path),
    ];
    let mut given = forms
        .iter()
        .filter_map(|(key, form)| mapping.get(*key).map(|v| (v, *form)));
    let (Some((values, form)), None) = (given.next(), given.next()) else {
        return Err(parse_error(
            file,
            format!("property '{}' needs exactly one of 'value', 'resource' or 'path'", name),
            None,
        ));
    };
    add_values(file, node, name, values, value_type, form, operation, category)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ValueForm {
    Literal,
    Resource,
    Path,
}

#[allow(clippy::too_many_arguments)]
fn add_values(
    file: &str,
    node: &mut DefinitionNode,
    name: &str,
    item: &YamlValue,
    value_type: Option<ValueType>,
    form: ValueForm,
    operation: PropertyOperation,
    category: Option<Category>,
) -> Result<()> {
    let make = |value: &YamlValue| -> Result<Value> {
        let text = scalar_text(file, value, name)?;
        Ok(match form {
            ValueForm::Literal => Value::new(value_type.unwrap_or_else(|| infer_type(value)), text),
            ValueForm::Resource => {
                Value::resource(value_type.unwrap_or(ValueType::String), text)
            }
            ValueForm::Path => {
                Value::path_reference(value_type.unwrap_or(ValueType::Reference), text)
            }
        })
    };

    let property = match item.as_sequence() {
        Some(items) => {
            let values = items.iter().map(&make).collect::<Result<Vec<_>>>()?;
            let list_type = value_type
                .or_else(|| values.first().map(Value::value_type))
                .unwrap_or(ValueType::String);
            node.add_list_property(name, list_type, values)?
        }
        None => node.add_property(name, make(item)?)?,
    };
    property.set_operation(operation);
    if let Some(category) = category {
        property.set_category(category);
    }
    Ok(())
}

fn infer_type(value: &YamlValue) -> ValueType {
    match value {
        YamlValue::Bool(_) => ValueType::Boolean,
        YamlValue::Number(n) if n.is_f64() => ValueType::Double,
        YamlValue::Number(_) => ValueType::Long,
        _ => ValueType::String,
    }
}

fn parse_category(file: &str, value: &YamlValue) -> Result<Category> {
    let text = scalar_text(file, value, "category")?;
    Category::from_name(&text).ok_or_else(|| {
        parse_error(
            file,
            format!("unknown category '{}'", text),
            Some("expected config, content, runtime or system"),
        )
    })
}

fn as_mapping<'a>(file: &str, value: &'a YamlValue, what: &str) -> Result<&'a Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| parse_error(file, format!("{} must be a mapping", what), None))
}

fn as_sequence<'a>(file: &str, value: &'a YamlValue, what: &str) -> Result<&'a [YamlValue]> {
    value
        .as_sequence()
        .map(Vec::as_slice)
        .ok_or_else(|| parse_error(file, format!("{} must be a list", what), None))
}

fn key_str<'a>(file: &str, key: &'a YamlValue) -> Result<&'a str> {
    key.as_str()
        .ok_or_else(|| parse_error(file, format!("keys must be strings, found {:?}", key), None))
}

fn scalar_text(file: &str, value: &YamlValue, what: &str) -> Result<String> {
    match value {
        YamlValue::String(s) => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        _ => Err(parse_error(
            file,
            format!("{} must be a scalar value", what),
            None,
        )),
    }
}

fn parse_error(file: &str, message: impl Into<String>, hint: Option<&str>) -> Error {
    Error::ConfigParse {
        file: file.to_string(),
        message: message.into(),
        hint: hint.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::PropertyKind;

    fn config_tree(source: &Source, index: usize) -> &TreeDefinition {
        match &source.definitions()[index] {
            Definition::Config(tree) => tree,
            other => panic!("expected a config definition, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_descriptor_plain_and_full_forms() {
        let descriptor = ModuleDescriptor::parse(
            "hcm-module.yaml",
            "group: g\nproject: { name: p, after: other }\nmodule:\n  name: m\n  after: [a, b]\n  site: intranet\n  hst-root: /hst:intranet\n",
        )
        .unwrap();
        assert_eq!(descriptor.group.name, "g");
        assert_eq!(descriptor.project.after, vec!["other"]);
        assert_eq!(descriptor.module.after, vec!["a", "b"]);

        let module = descriptor.to_module();
        assert_eq!(module.full_name(), "g/p/m");
        assert_eq!(module.site(), Some("intranet"));
        assert_eq!(module.hst_root(), Some("/hst:intranet"));
    }

    #[test]
    fn test_descriptor_missing_module_is_reported() {
        let err = ModuleDescriptor::parse("hcm-module.yaml", "group: g\nproject: p\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { hint: Some(_), .. }));
    }

    #[test]
    fn test_descriptor_round_trips_through_module() {
        let module = Module::new(
            Coordinate::new("g").after(["base"]),
            Coordinate::new("p"),
            Coordinate::new("m"),
        );
        let yaml = ModuleDescriptor::from_module(&module).to_yaml().unwrap();
        let parsed = ModuleDescriptor::parse("synthesized", &yaml).unwrap();
        assert_eq!(parsed.group.after, vec!["base"]);
        assert_eq!(parsed.to_module().full_name(), "g/p/m");
    }

    #[test]
    fn test_parse_config_source() {
        let text = r#"
definitions:
  namespace:
    - prefix: myns
      uri: http://example.com/myns/1.0
      cnd: myns.cnd
  config:
    /a/b:
      prop: value
      count: 42
      list: [x, y]
      typed: { type: long, value: 7 }
      appended: { operation: add, value: [z] }
      gone: { operation: delete }
      data: { type: binary, resource: data.bin }
      .meta:order-before: c
      .meta:residual-child-node-category: content
      /child:
        .meta:delete: true
      /sns[2]:
        .meta:category: runtime
  webfilebundle: site
"#;
        let source = parse_config_source("main.yaml", text).unwrap();
        assert_eq!(source.raw(), text);
        assert_eq!(source.definitions().len(), 3);

        match &source.definitions()[0] {
            Definition::Namespace(ns) => {
                assert_eq!(ns.prefix, "myns");
                assert!(ns.cnd.as_ref().unwrap().is_resource());
            }
            other => panic!("expected a namespace, got {:?}", other.kind()),
        }

        let root = config_tree(&source, 1).root();
        assert_eq!(root.path().to_string(), "/a/b");
        assert_eq!(root.property("prop").unwrap().values()[0].text(), "value");
        assert_eq!(root.property("count").unwrap().value_type(), ValueType::Long);
        assert_eq!(root.property("list").unwrap().kind(), PropertyKind::List);
        assert_eq!(root.property("typed").unwrap().values()[0].text(), "7");
        assert_eq!(
            root.property("appended").unwrap().operation(),
            PropertyOperation::Add
        );
        assert_eq!(
            root.property("gone").unwrap().operation(),
            PropertyOperation::Delete
        );
        let data = root.property("data").unwrap();
        assert_eq!(data.value_type(), ValueType::Binary);
        assert!(data.values()[0].is_resource());
        assert_eq!(root.order_before(), Some("c"));
        assert_eq!(root.residual_child_node_category(), Some(Category::Content));
        assert!(root.node("child").unwrap().is_delete());
        assert_eq!(
            root.node("sns[2]").unwrap().category(),
            Some(Category::Runtime)
        );

        assert!(matches!(
            &source.definitions()[2],
            Definition::Bundle(bundle) if bundle.name == "site"
        ));
    }

    #[test]
    fn test_deleted_node_with_content_is_rejected() {
        let text = "definitions:\n  config:\n    /a:\n      .meta:delete: true\n      p: v\n";
        let err = parse_config_source("bad.yaml", text).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_unknown_definition_type_is_rejected() {
        let err = parse_config_source("bad.yaml", "definitions:\n  widgets: []\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { hint: Some(_), .. }));
    }

    #[test]
    fn test_property_needs_one_value_form() {
        let text = "definitions:\n  config:\n    /a:\n      p: { value: x, path: /y }\n";
        assert!(parse_config_source("bad.yaml", text).is_err());
    }

    #[test]
    fn test_empty_order_before_means_first() {
        let text = "definitions:\n  config:\n    /a:\n      .meta:order-before: ''\n";
        let source = parse_config_source("main.yaml", text).unwrap();
        assert_eq!(config_tree(&source, 0).root().order_before(), Some(""));
    }

    #[test]
    fn test_parse_content_source() {
        let source =
            parse_content_source("pages.yaml", "/content/pages:\n  title: Home\n").unwrap();
        assert_eq!(source.kind(), SourceKind::Content);
        match &source.definitions()[0] {
            Definition::Content(tree) => assert_eq!(tree.root_path().to_string(), "/content/pages"),
            other => panic!("expected content, got {:?}", other.kind()),
        }

        assert!(parse_content_source("two.yaml", "/a: {}\n/b: {}\n").is_err());
    }

    #[test]
    fn test_load_module_from_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("modules/m");
        fs::create_dir_all(root.join("hcm-config/sub")).unwrap();
        fs::create_dir_all(root.join("hcm-content")).unwrap();
        fs::write(root.join(DESCRIPTOR_FILE), "group: g\nproject: p\nmodule: m\n").unwrap();
        fs::write(
            root.join("hcm-config/sub/main.yaml"),
            "definitions:\n  config:\n    /a:\n      p: v\n",
        )
        .unwrap();
        fs::write(root.join("hcm-config/sub/data.txt"), "not a source").unwrap();
        fs::write(root.join("hcm-content/home.yaml"), "/content/home: {}\n").unwrap();

        let modules = load_modules(temp.path()).unwrap();
        assert_eq!(modules.len(), 1);
        let module = &modules[0];
        assert_eq!(module.full_name(), "g/p/m");
        let paths: Vec<&str> = module.sources().iter().map(Source::path).collect();
        assert_eq!(paths, vec!["sub/main.yaml", "home.yaml"]);
        assert!(module.descriptor().is_some());
        assert!(module.actions().is_none());
        assert!(module
            .config_resources()
            .has_resource(&module.sources()[0], "data.txt"));
    }
}
