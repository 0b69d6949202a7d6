//! Content hashing and duplicate tracking for driveback.
//!
//! Two files are duplicates when their BLAKE3 digests match. The
//! [`Manifest`] remembers every digest already backed up, so a file is
//! copied at most once across all runs.
//!
//! # Overview
//!
//! - [`hash_file`] streams a file through BLAKE3 in 64 KiB reads
//! - [`hash_all`] hashes a batch on a rayon pool, keeping input order
//! - [`Manifest`] loads, queries, extends and atomically saves
//!   `manifest.json`

mod hasher;
mod manifest;

pub use hasher::{hash_all, hash_file, hash_pool, hash_reader, Hashed};
pub use manifest::Manifest;
