//! # Build Command Implementation
//!
//! This module implements the `build` subcommand: load every module below a
//! directory, sort the hierarchy and merge the config definitions.
//!
//! The output lists the modules in merge order followed by a summary of the
//! merged model. This command never writes anything.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use hconf::model::ConfigurationModel;

/// Load, sort and merge all modules below a directory
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory to search for module descriptors.
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,
}

/// Execute the `build` command.
pub fn execute(args: BuildArgs) -> Result<()> {
    let model = super::load(&args.root)?;
    print!("{}", render(&model));
    Ok(())
}

/// Module order and summary, as printed by the command.
fn render(model: &ConfigurationModel) -> String {
    let mut out = String::from("Module order:\n");
    for (position, module) in model.modules().enumerate() {
        let site = module
            .site()
            .map(|site| format!(" (site {})", site))
            .unwrap_or_default();
        out.push_str(&format!("  {}. {}{}\n", position + 1, module.full_name(), site));
    }

    let tree = model.tree();
    out.push_str("\nSummary:\n");
    out.push_str(&format!("  nodes:               {}\n", tree.live_node_count()));
    out.push_str(&format!("  deleted nodes:       {}\n", tree.deleted_nodes().count()));
    out.push_str(&format!("  deleted properties:  {}\n", tree.deleted_properties().len()));
    out.push_str(&format!(
        "  namespaces:          {}\n",
        model.namespace_definitions().len()
    ));
    out.push_str(&format!(
        "  content definitions: {}\n",
        model.content_definitions().len()
    ));
    out.push_str(&format!(
        "  web file bundles:    {}\n",
        model.bundle_definitions().len()
    ));
    for (site, root) in model.sites() {
        out.push_str(&format!("  site {}: {}\n", site, root));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hconf::module::Module;

    #[test]
    fn test_execute_missing_root() {
        let args = BuildArgs {
            root: PathBuf::from("/nonexistent/modules"),
        };
        let result = execute(args);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_render_lists_modules_in_order() {
        let mut model = ConfigurationModel::new();
        model.add_module(Module::named("b", "p", "m"));
        model.add_module(Module::named("a", "p", "m").with_site(Some("web")));
        model.add_module(Module::named("a", "p", "m"));
        model.build().unwrap();

        let text = render(&model);
        let a = text.find("1. a/p/m\n").unwrap();
        let b = text.find("2. b/p/m\n").unwrap();
        let web = text.find("3. a/p/m (site web)").unwrap();
        assert!(a < b && b < web);
        assert!(text.contains("site web: /hst:web"));
    }
}
