//! Revision subsystem for barrel
//!
//! Revision identifiers (`<generation>-<hash>`) and the revision tree each
//! document carries. The tree is a directed forest keyed by revision id;
//! roots have an empty parent, and a leaf is any entry never named as a
//! parent. The winning revision is recomputed from the leaves after every
//! accepted write.

mod errors;
mod revid;
mod tree;

pub use errors::{RevisionError, RevisionResult};
pub use revid::RevId;
pub use tree::{RevInfo, RevTree, Winner};
