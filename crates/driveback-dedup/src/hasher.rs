//! Streaming content hashing.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake3::Hasher;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use driveback_core::{BackupError, Candidate, ContentDigest, Result};

/// Read buffer size for hashing.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// A candidate paired with the digest of its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashed {
    pub candidate: Candidate,
    pub digest: ContentDigest,
}

/// Compute the BLAKE3 digest of everything `reader` yields.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentDigest> {
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentDigest::new(*hasher.finalize().as_bytes()))
}

/// Compute the digest of a file, streamed.
pub fn hash_file(path: &Path) -> Result<ContentDigest> {
    let file = File::open(path).map_err(|e| BackupError::io(path, e))?;
    hash_reader(file).map_err(|e| BackupError::io(path, e))
}

/// Build the worker pool used by [`hash_all`] (0 threads = one per core).
pub fn hash_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("driveback-hash-{i}"))
        .build()
        .map_err(|e| BackupError::InvalidConfig {
            message: format!("Failed to start hashing pool: {e}"),
        })
}

/// Hash a batch of candidates on `pool`.
///
/// Results keep the input order. The first failure fails the batch.
pub fn hash_all(pool: &ThreadPool, candidates: Vec<Candidate>) -> Result<Vec<Hashed>> {
    debug!(count = candidates.len(), "hashing batch");
    pool.install(|| {
        candidates
            .into_par_iter()
            .map(|candidate| {
                let digest = hash_file(&candidate.path)?;
                Ok(Hashed { candidate, digest })
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_reader_matches_one_shot() {
        let data = vec![7u8; HASH_BUFFER_SIZE * 3 + 17];
        let streamed = hash_reader(&data[..]).unwrap();
        assert_eq!(streamed.as_bytes(), blake3::hash(&data).as_bytes());
    }

    #[test]
    fn test_hash_empty_input() {
        let digest = hash_reader(io::empty()).unwrap();
        assert_eq!(digest.as_bytes(), blake3::hash(b"").as_bytes());
    }

    #[test]
    fn test_hash_file_identical_content() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.jpg"), "same bytes").unwrap();
        fs::write(temp.path().join("b.jpg"), "same bytes").unwrap();
        fs::write(temp.path().join("c.jpg"), "other bytes").unwrap();

        let a = hash_file(&temp.path().join("a.jpg")).unwrap();
        let b = hash_file(&temp.path().join("b.jpg")).unwrap();
        let c = hash_file(&temp.path().join("c.jpg")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = hash_file(&temp.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(err, BackupError::NotFound { .. }));
    }

    #[test]
    fn test_hash_all_preserves_order() {
        let temp = TempDir::new().unwrap();
        let candidates: Vec<Candidate> = (0..20)
            .map(|i| {
                let name = format!("f{i:02}.txt");
                let path = temp.path().join(&name);
                fs::write(&path, format!("content {i}")).unwrap();
                Candidate::new(path, name)
            })
            .collect();

        let pool = hash_pool(4).unwrap();
        let hashed = hash_all(&pool, candidates.clone()).unwrap();

        assert_eq!(hashed.len(), candidates.len());
        for (i, item) in hashed.iter().enumerate() {
            assert_eq!(item.candidate, candidates[i]);
            assert_eq!(item.digest, hash_file(&candidates[i].path).unwrap());
        }
    }

    #[test]
    fn test_hash_all_fails_on_unreadable_member() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("here.txt");
        fs::write(&present, "x").unwrap();
        let candidates = vec![
            Candidate::new(&present, "here.txt"),
            Candidate::new(temp.path().join("gone.txt"), "gone.txt"),
        ];

        let pool = hash_pool(1).unwrap();
        assert!(hash_all(&pool, candidates).is_err());
    }
}
