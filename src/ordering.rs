//! Deterministic dependency ordering
//!
//! Sites, groups, projects and modules all declare soft dependencies on their
//! siblings through an `after` set. [`DependencyOrderer`] puts such a list in
//! dependency order with a depth-first topological sort.
//!
//! ## Process
//!
//! 1.  **Name Index**: Every entity is indexed by name. A repeated name is a
//!     `DuplicateName` error.
//!
//! 2.  **Depth-First Traversal**: Entities are visited in alphabetical order,
//!     and so is each entity's `after` set. A dependency is emitted before the
//!     entity that depends on it. Sorting at every level makes the result
//!     independent of the input order.
//!
//! 3.  **Chain Tracking**: The names on the current recursion path are kept on
//!     a stack. Meeting one of them again is a `CircularDependency` error
//!     carrying the whole chain, e.g. `a -> b -> a`.
//!
//! 4.  **Missing Dependencies**: An `after` entry that names nothing in the
//!     list is a `MissingDependency` error, unless the orderer was told that
//!     name is implicitly satisfied (see [`DependencyOrderer::with_implicit`]).

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::error::{Error, Result};

/// A named entity that may have to come after some of its siblings
pub trait Orderable {
    fn name(&self) -> &str;
    fn after(&self) -> &BTreeSet<String>;
}

/// Topological sorter for one kind of [`Orderable`]
#[derive(Debug, Clone)]
pub struct DependencyOrderer {
    kind: String,
    implicit: BTreeSet<String>,
}

impl DependencyOrderer {
    /// `kind` names the entities in error messages ("group", "module", ...).
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            implicit: BTreeSet::new(),
        }
    }

    /// Treat these names as already satisfied dependencies.
    ///
    /// Used to let a site's groups depend on core groups that are not part of
    /// the list being sorted.
    pub fn with_implicit<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implicit.extend(names.into_iter().map(Into::into));
        self
    }

    /// Reorder `items` in place so that every entity follows its dependencies.
    pub fn sort<T: Orderable>(&self, items: &mut Vec<T>) -> Result<()> {
        let order = self.compute_order(items)?;

        let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
        for index in order {
            if let Some(item) = slots.get_mut(index).and_then(Option::take) {
                items.push(item);
            }
        }
        Ok(())
    }

    fn compute_order<T: Orderable>(&self, items: &[T]) -> Result<Vec<usize>> {
        let mut by_name: BTreeMap<&str, usize> = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            if by_name.insert(item.name(), index).is_some() {
                return Err(Error::DuplicateName {
                    kind: self.kind.clone(),
                    name: item.name().to_string(),
                });
            }
        }

        let mut state = SortState {
            items,
            by_name: &by_name,
            chain: Vec::new(),
            done: BTreeSet::new(),
            order: Vec::with_capacity(items.len()),
        };
        for (_, &index) in by_name.iter() {
            self.visit(index, &mut state)?;
        }
        trace!(
            "sorted {} {}s: {:?}",
            state.order.len(),
            self.kind,
            state
                .order
                .iter()
                .map(|&i| items[i].name())
                .collect::<Vec<_>>()
        );
        Ok(state.order)
    }

    fn visit<T: Orderable>(&self, index: usize, state: &mut SortState<'_, T>) -> Result<()> {
        if state.done.contains(&index) {
            return Ok(());
        }
        let items = state.items;
        let by_name = state.by_name;
        let item = &items[index];

        if let Some(start) = state.chain.iter().position(|&i| i == index) {
            let mut chain: Vec<String> = state.chain[start..]
                .iter()
                .map(|&i| items[i].name().to_string())
                .collect();
            chain.push(item.name().to_string());
            return Err(Error::CircularDependency {
                kind: self.kind.clone(),
                chain,
            });
        }

        state.chain.push(index);
        // BTreeSet iterates alphabetically
        for dependency in item.after() {
            match by_name.get(dependency.as_str()) {
                Some(&dep_index) => self.visit(dep_index, state)?,
                None => self.missing_dependency(item.name(), dependency)?,
            }
        }
        state.chain.pop();

        state.done.insert(index);
        state.order.push(index);
        Ok(())
    }

    /// Decide what an unresolved `after` entry means.
    fn missing_dependency(&self, name: &str, dependency: &str) -> Result<()> {
        if self.implicit.contains(dependency) {
            return Ok(());
        }
        Err(Error::MissingDependency {
            kind: self.kind.clone(),
            name: name.to_string(),
            dependency: dependency.to_string(),
        })
    }
}

struct SortState<'a, T> {
    items: &'a [T],
    by_name: &'a BTreeMap<&'a str, usize>,
    chain: Vec<usize>,
    done: BTreeSet<usize>,
    order: Vec<usize>,
}
