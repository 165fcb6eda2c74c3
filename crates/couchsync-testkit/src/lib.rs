//! # couchsync Testkit
//!
//! Testing utilities for couchsync.
//!
//! - **Fixtures**: scratch project directories with a sample app
//! - **Generators**: proptest strategies for project trees
//!
//! ```rust
//! use couchsync_testkit::ProjectFixture;
//!
//! let project = ProjectFixture::blog();
//! assert!(project.exists("views/recent/map.js"));
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::ProjectFixture;
pub use generators::{project_tree, write_tree, Node};
