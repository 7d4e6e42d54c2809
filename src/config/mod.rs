//! Workflow configuration resolution.
//!
//! Turns a hierarchical YAML/JSON workflow document into flat per-step views:
//! 1. **Properties** - tool parameters, with system settings inherited by every step
//! 2. **Paths** - absolute filesystem paths, with `dependency/<step>/<key>` references resolved
//!
//! ## Document shapes
//! - Single step: `paths`/`properties` at the root (or in the selected system body)
//! - Multi step: root keys (and system body keys) whose values carry `paths`/`properties`
//! - Degenerate: neither; the whole document becomes one unnamed entry
//!
//! ## Path values
//! - `file:<literal>` - used verbatim
//! - `dependency/<step>/<key>` - borrows another step's path, chains are followed
//! - anything else - joined under `<working_dir>/<prefix>/<step>/`

mod loader;
mod merge;
mod paths;
mod properties;
mod reader;
mod resolved;
mod shape;

pub use loader::{ConfigSource, LoadedDocument, load_document};
pub use merge::{overlay, overlay_all};
pub use paths::PathValue;
pub use properties::StepProperties;
pub use reader::ConfReader;
pub use resolved::{Resolved, ResolvedPaths, ResolvedProperties, StepPaths};
pub use shape::DocumentShape;
