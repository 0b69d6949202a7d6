//! Source-tree walking for driveback.
//!
//! This crate turns a root directory into a lazy sequence of backup
//! candidates using jwalk for traversal.
//!
//! # Overview
//!
//! - **Depth-first**, single-threaded traversal with name-sorted siblings
//! - **Symlinks skipped**: never followed, never yielded
//! - **Prefix exclusion**: directories whose root-relative path starts with
//!   an excluded prefix are pruned before they are read
//! - **Extension allow-list**: regular files are yielded only when their
//!   lowercased extension is allowed
//!
//! The per-entry rules live in [`policy`] as pure functions.
//!
//! # Example
//!
//! ```rust,no_run
//! use driveback_scan::{ScanPolicy, TreeWalker};
//!
//! let walker = TreeWalker::new("/home/ana", ScanPolicy::default());
//! for candidate in walker.candidates()? {
//!     let candidate = candidate?;
//!     println!("{}", candidate.relative.display());
//! }
//! # Ok::<(), driveback_scan::BackupError>(())
//! ```

pub mod policy;
mod walker;

pub use policy::{classify, Decision, EntryKind};
pub use walker::{Candidates, TreeWalker};

// Re-export core types for convenience
pub use driveback_core::{BackupError, Candidate, ScanPolicy};
