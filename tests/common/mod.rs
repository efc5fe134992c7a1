//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_module("base", descriptors::BASE)
//!         .with_file("base/hcm-config/main.yaml", fragments::BASE);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{descriptors, fragments};
    pub use super::TestFixture;
}

/// Module descriptors used across tests.
#[allow(dead_code)]
pub mod descriptors {
    /// The module every other test module depends on.
    pub const BASE: &str = "group: platform\nproject: core\nmodule: base\n";

    /// A module of another group, merged after `platform`.
    pub const OVERLAY: &str = r#"group:
  name: project
  after: platform
project: website
module: overlay
"#;

    /// A module of the `intranet` site.
    pub const INTRANET: &str = r#"group: project
project: website
module:
  name: intranet
  site: intranet
"#;
}

/// Config fragments used across tests.
#[allow(dead_code)]
pub mod fragments {
    pub const BASE: &str = r#"definitions:
  namespace:
    - prefix: app
      uri: http://example.com/app/1.0
  config:
    /config:
      /app:
        title: Base
        tags: [one]
        retries: 3
        /first:
        /second:
        /third:
"#;

    pub const OVERLAY: &str = r#"definitions:
  config:
    /config/app:
      title: Overlay
      tags:
        operation: add
        value: [two]
      /third:
        .meta:order-before: first
      /second:
        .meta:delete: true
"#;

    pub const INTRANET: &str = r#"definitions:
  config:
    /config/intranet:
      enabled: true
"#;
}

/// A temporary directory populated with modules.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a module directory with the given descriptor.
    pub fn with_module(self, dir: &str, descriptor: &str) -> Self {
        self.with_file(&format!("{}/hcm-module.yaml", dir), descriptor)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// The `base` and `overlay` modules with their config sources.
    pub fn with_core_modules(self) -> Self {
        self.with_module("base", descriptors::BASE)
            .with_file("base/hcm-config/main.yaml", fragments::BASE)
            .with_module("overlay", descriptors::OVERLAY)
            .with_file("overlay/hcm-config/main.yaml", fragments::OVERLAY)
    }

    /// The `intranet` site module.
    pub fn with_intranet_site(self) -> Self {
        self.with_module("intranet", descriptors::INTRANET)
            .with_file("intranet/hcm-config/main.yaml", fragments::INTRANET)
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command for the hconf binary, pointed at this fixture.
    pub fn command(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("hconf");
        cmd.arg(subcommand).arg(self.path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
