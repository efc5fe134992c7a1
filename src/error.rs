//! # Error Handling
//!
//! This module defines the centralized error type for `hconf`. It uses the
//! `thiserror` library to build one `Error` enum that covers every fatal
//! failure the engine can report, each variant carrying enough context to fix
//! the offending fragment.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants fall into four groups:
//!   - input shape errors: malformed path segments, duplicate, circular or
//!     missing dependency names;
//!   - cross-fragment consistency errors: duplicate definition roots, namespace
//!     definitions spread over several sources or declared by a site module;
//!   - tree resolution errors raised while folding definitions into the
//!     merged tree;
//!   - resource and digest errors, plus wrapped foreign errors (I/O, YAML,
//!     JSON, directory walking).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the library.
//!
//! Soft conditions (an `order-before` target that does not exist yet, deleting
//! something that was never defined) are not errors. They are logged and the
//! build carries on.

use thiserror::Error;

/// Main error type for hconf operations
#[derive(Error, Debug)]
pub enum Error {
    /// A node name could not be parsed as `name` or `name[index]`.
    #[error("Invalid path segment '{text}': {message}")]
    InvalidPathSegment { text: String, message: String },

    /// An absolute node path could not be parsed.
    #[error("Invalid node path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// Two entities in one sort scope share a name.
    #[error("Duplicate {kind} name '{name}'")]
    DuplicateName { kind: String, name: String },

    /// A chain of `after` dependencies loops back onto itself.
    ///
    /// The chain starts and ends with the same name.
    #[error("Circular dependency between {kind}s: {}", chain.join(" -> "))]
    CircularDependency { kind: String, chain: Vec<String> },

    /// An `after` dependency names an entity that is not in the sort scope.
    #[error("{kind} '{name}' has a missing dependency '{dependency}'")]
    MissingDependency {
        kind: String,
        name: String,
        dependency: String,
    },

    /// A module received a second source with a path it already owns.
    #[error("Module '{module}' already contains a source at '{source_path}'")]
    DuplicateSource { module: String, source_path: String },

    /// Two definitions of one module share a root path.
    #[error("Duplicate definition root '{root}' in module '{module}': defined in '{first}' and '{second}'")]
    DuplicateDefinitionRoot {
        module: String,
        root: String,
        first: String,
        second: String,
    },

    /// Namespace definitions of one module come from more than one source.
    #[error("Module '{module}' declares namespaces in more than one source: '{first}' and '{second}'")]
    MultipleNamespaceSources {
        module: String,
        first: String,
        second: String,
    },

    /// A module belonging to a site declares namespace definitions.
    #[error("Namespace definitions are only allowed in core modules, but site module '{module}' (site '{site}') declares them")]
    NamespaceInSiteModule { module: String, site: String },

    /// A definition node could not be resolved against the merged tree.
    #[error("Cannot resolve node '{path}' defined in {origin}: {message}")]
    NodeResolution {
        path: String,
        origin: String,
        message: String,
    },

    /// A module could not be located in the hierarchy.
    #[error("Hierarchy error: {message}")]
    Hierarchy { message: String },

    /// A fragment file or module descriptor could not be turned into a module.
    #[error("Configuration parsing error in {file}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        file: String,
        message: String,
        /// Optional hint for how to fix the fragment
        hint: Option<String>,
    },

    /// A resource referenced by a definition does not exist.
    #[error("Resource '{path}' referenced from '{source_path}' in module '{module}' does not exist")]
    ResourceNotFound {
        module: String,
        source_path: String,
        path: String,
    },

    /// Digest computation failed while reading a resource.
    #[error("Digest computation failed for '{path}' in module '{module}': {message}")]
    Digest {
        module: String,
        path: String,
        message: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A directory traversal error, wrapped from `walkdir::Error`.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
