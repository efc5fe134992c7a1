//! Site → Group → Project → Module containers
//!
//! The hierarchy only exists to fix a deterministic module order. Sorting runs
//! top-down with one [`DependencyOrderer`] per level:
//!
//! 1.  **Sites**: the core site first, then the remaining sites. Every site
//!     implicitly comes after core.
//! 2.  **Groups**: sorted per site. Groups of a non-core site may depend on any
//!     core group.
//! 3.  **Projects**: sorted per group.
//! 4.  **Modules**: sorted per project.
//!
//! The flattened module sequence (core first, then each site in site order)
//! is what the merge consumes.

use std::collections::BTreeSet;

use log::debug;

use crate::error::Result;
use crate::module::{Coordinate, Module};
use crate::ordering::{DependencyOrderer, Orderable};

/// Name of the site every module without an explicit site belongs to.
pub const CORE_SITE: &str = "core";

/// Modules of one project
#[derive(Debug, Clone)]
pub struct Project {
    coordinate: Coordinate,
    modules: Vec<Module>,
}

impl Project {
    fn new(name: &str) -> Self {
        Self {
            coordinate: Coordinate::new(name),
            modules: Vec::new(),
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    fn sort(&mut self) -> Result<()> {
        DependencyOrderer::new("module").sort(&mut self.modules)
    }
}

impl Orderable for Project {
    fn name(&self) -> &str {
        &self.coordinate.name
    }

    fn after(&self) -> &BTreeSet<String> {
        &self.coordinate.after
    }
}

/// Projects of one group
#[derive(Debug, Clone)]
pub struct Group {
    coordinate: Coordinate,
    projects: Vec<Project>,
}

impl Group {
    fn new(name: &str) -> Self {
        Self {
            coordinate: Coordinate::new(name),
            projects: Vec::new(),
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    fn project_mut(&mut self, name: &str) -> &mut Project {
        let index = match self.projects.iter().position(|p| p.coordinate.name == name) {
            Some(index) => index,
            None => {
                self.projects.push(Project::new(name));
                self.projects.len() - 1
            }
        };
        &mut self.projects[index]
    }

    fn sort(&mut self) -> Result<()> {
        DependencyOrderer::new("project").sort(&mut self.projects)?;
        for project in &mut self.projects {
            project.sort()?;
        }
        Ok(())
    }
}

impl Orderable for Group {
    fn name(&self) -> &str {
        &self.coordinate.name
    }

    fn after(&self) -> &BTreeSet<String> {
        &self.coordinate.after
    }
}

/// Groups of one site
#[derive(Debug, Clone)]
pub struct Site {
    name: String,
    after: BTreeSet<String>,
    groups: Vec<Group>,
}

impl Site {
    fn new(name: &str) -> Self {
        let mut after = BTreeSet::new();
        if name != CORE_SITE {
            after.insert(CORE_SITE.to_string());
        }
        Self {
            name: name.to_string(),
            after,
            groups: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_core(&self) -> bool {
        self.name == CORE_SITE
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    fn group_mut(&mut self, name: &str) -> &mut Group {
        let index = match self.groups.iter().position(|g| g.coordinate.name == name) {
            Some(index) => index,
            None => {
                self.groups.push(Group::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.coordinate.name.clone()).collect()
    }

    fn sort(&mut self, orderer: &DependencyOrderer) -> Result<()> {
        orderer.sort(&mut self.groups)?;
        for group in &mut self.groups {
            group.sort()?;
        }
        Ok(())
    }
}

impl Orderable for Site {
    fn name(&self) -> &str {
        &self.name
    }

    fn after(&self) -> &BTreeSet<String> {
        &self.after
    }
}

/// All sites, with the core site always present
#[derive(Debug, Clone)]
pub struct Hierarchy {
    sites: Vec<Site>,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self {
            sites: vec![Site::new(CORE_SITE)],
        }
    }
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a module under its site, group and project.
    ///
    /// The group's and project's `after` sets are the union of what every
    /// module in them declares.
    pub fn add_module(&mut self, module: Module) {
        let site_name = module.site().unwrap_or(CORE_SITE).to_string();
        let site = self.site_mut(&site_name);

        let group = site.group_mut(&module.group().name);
        group
            .coordinate
            .after
            .extend(module.group().after.iter().cloned());

        let project = group.project_mut(&module.project().name);
        project
            .coordinate
            .after
            .extend(module.project().after.iter().cloned());

        project.modules.push(module);
    }

    fn site_mut(&mut self, name: &str) -> &mut Site {
        let index = match self.sites.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                self.sites.push(Site::new(name));
                self.sites.len() - 1
            }
        };
        &mut self.sites[index]
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Names of the non-core sites, in sort order once sorted.
    pub fn site_names(&self) -> impl Iterator<Item = &str> {
        self.sites
            .iter()
            .filter(|s| !s.is_core())
            .map(|s| s.name.as_str())
    }

    /// Sort every level in place.
    pub fn sort(&mut self) -> Result<()> {
        let (mut core, mut others): (Vec<Site>, Vec<Site>) =
            self.sites.drain(..).partition(Site::is_core);
        DependencyOrderer::new("site")
            .with_implicit([CORE_SITE])
            .sort(&mut others)?;

        let mut core_site = core.pop().unwrap_or_else(|| Site::new(CORE_SITE));
        core_site.sort(&DependencyOrderer::new("group"))?;
        let core_groups = core_site.group_names();

        let site_orderer = DependencyOrderer::new("group").with_implicit(core_groups);
        for site in &mut others {
            site.sort(&site_orderer)?;
        }

        self.sites.push(core_site);
        self.sites.extend(others);
        debug!(
            "sorted hierarchy: {} site(s), {} module(s)",
            self.sites.len(),
            self.modules().count()
        );
        Ok(())
    }

    /// All modules: core first, then each site, in hierarchy order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.sites
            .iter()
            .flat_map(|s| s.groups.iter())
            .flat_map(|g| g.projects.iter())
            .flat_map(|p| p.modules.iter())
    }

    pub fn modules_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.sites
            .iter_mut()
            .flat_map(|s| s.groups.iter_mut())
            .flat_map(|g| g.projects.iter_mut())
            .flat_map(|p| p.modules.iter_mut())
    }

    pub fn module_count(&self) -> usize {
        self.modules().count()
    }
}
