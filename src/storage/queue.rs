//! Directory-backed entropy queue.

use super::codec::EntropySet;
use super::{QueueError, SetSource};
use crate::config::StorageConfig;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use rand_core::SeedableRng;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Extension that marks a file as a resident entropy set.
const SET_EXTENSION: &str = "json";

/// A bounded, durable queue of entropy sets stored as files in one directory.
///
/// Every set file is written atomically (temporary file plus rename) and is
/// deleted as soon as a consumer reads it, so no set can be handed out twice.
///
/// # Ownership
///
/// A directory must have at most one consuming `EntropyQueue`. Nothing here
/// arbitrates between two consumers racing on the same file; producers in
/// other processes are fine since they only ever add files.
pub struct EntropyQueue {
    directory: PathBuf,
    prefix: String,
    /// Disambiguates names written within the same second.
    counter: u64,
    /// Picks which resident set to hand out. Never used as output entropy.
    selector: ChaCha20Rng,
    sets_written: u64,
    sets_taken: u64,
}

impl EntropyQueue {
    /// Opens (creating if needed) a queue rooted at `directory`.
    pub fn open(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self, QueueError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;

        let queue = Self {
            directory,
            prefix: prefix.into(),
            counter: 0,
            selector: ChaCha20Rng::from_entropy(),
            sets_written: 0,
            sets_taken: 0,
        };

        tracing::debug!(
            directory = %queue.directory.display(),
            resident = queue.size()?,
            "Opened entropy queue"
        );
        Ok(queue)
    }

    /// Opens the queue described by a storage configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self, QueueError> {
        Self::open(&config.directory, config.prefix.clone())
    }

    /// Replaces the set selector with a seeded one (for reproducible tests).
    pub fn with_selector_seed(mut self, seed: u64) -> Self {
        self.selector = ChaCha20Rng::seed_from_u64(seed);
        self
    }

    /// Persists `words` as a new entropy set and returns its path.
    pub fn enqueue(&mut self, words: &[u32]) -> Result<PathBuf, QueueError> {
        let set = EntropySet::new(words.to_vec());
        set.validate().map_err(QueueError::InvalidSet)?;

        let body = serde_json::to_vec(&set)?;
        let digest = blake3::hash(&body).to_hex();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

        let mut staged = NamedTempFile::new_in(&self.directory)?;
        staged.write_all(&body)?;
        staged.as_file().sync_all()?;

        let path = loop {
            self.counter += 1;
            let name = format!(
                "{}_{}_{:06}_{}.{}",
                self.prefix,
                timestamp,
                self.counter,
                &digest.as_str()[..8],
                SET_EXTENSION
            );
            let path = self.directory.join(name);
            match staged.persist_noclobber(&path) {
                Ok(_) => break path,
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    tracing::warn!(path = %path.display(), "Set name taken, retrying");
                    staged = e.file;
                }
                Err(e) => return Err(e.error.into()),
            }
        };

        self.sets_written += 1;
        tracing::debug!(
            path = %path.display(),
            words = words.len(),
            "Saved entropy set"
        );
        Ok(path)
    }

    /// Number of sets currently resident in the directory.
    ///
    /// Always re-reads the directory.
    pub fn size(&self) -> Result<usize, QueueError> {
        Ok(self.set_paths()?.len())
    }

    /// Returns true if no sets are resident.
    pub fn is_empty(&self) -> Result<bool, QueueError> {
        Ok(self.size()? == 0)
    }

    /// Removes one resident set chosen uniformly at random and returns its words.
    ///
    /// The file is deleted before its contents are parsed. A set that fails
    /// to parse is reported as [`QueueError::MalformedSet`] and is gone.
    pub fn take_random(&mut self) -> Result<Vec<u32>, QueueError> {
        let paths = self.set_paths()?;
        let path = paths
            .choose(&mut self.selector)
            .ok_or(QueueError::PoolExhausted)?;

        let body = fs::read(path)?;
        fs::remove_file(path)?;
        self.sets_taken += 1;

        let set = EntropySet::from_json(path, &body)?;
        tracing::debug!(
            path = %path.display(),
            bits = set.bit_count(),
            remaining = paths.len() - 1,
            "Loaded and removed entropy set"
        );
        Ok(set.integer_list)
    }

    /// Returns the queue directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Sets written through this handle.
    pub fn sets_written(&self) -> u64 {
        self.sets_written
    }

    /// Sets removed through this handle.
    pub fn sets_taken(&self) -> u64 {
        self.sets_taken
    }

    fn set_paths(&self) -> Result<Vec<PathBuf>, QueueError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == SET_EXTENSION) {
                paths.push(path);
            }
        }
        // read_dir order is unspecified; sort so a seeded selector is reproducible
        paths.sort();
        Ok(paths)
    }
}

impl SetSource for EntropyQueue {
    fn take_random(&mut self) -> Result<Vec<u32>, QueueError> {
        EntropyQueue::take_random(self)
    }
}

impl std::fmt::Debug for EntropyQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntropyQueue")
            .field("directory", &self.directory)
            .field("prefix", &self.prefix)
            .field("sets_written", &self.sets_written)
            .field("sets_taken", &self.sets_taken)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_queue() -> (tempfile::TempDir, EntropyQueue) {
        let dir = tempfile::tempdir().unwrap();
        let queue = EntropyQueue::open(dir.path(), "hotbits").unwrap();
        (dir, queue)
    }

    #[test]
    fn test_enqueue_increments_size() {
        let (_dir, mut queue) = temp_queue();
        assert_eq!(queue.size().unwrap(), 0);

        queue.enqueue(&[1, 2, 3]).unwrap();
        queue.enqueue(&[1, 2, 3]).unwrap();

        // Same contents in the same second still get distinct names
        assert_eq!(queue.size().unwrap(), 2);
        assert_eq!(queue.sets_written(), 2);
    }

    #[test]
    fn test_set_file_name_and_contents() {
        let (_dir, mut queue) = temp_queue();
        let path = queue.enqueue(&[5, 10]).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("hotbits_"));
        assert!(name.ends_with(".json"));

        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body, r#"{"integerList":[5,10]}"#);
    }

    #[test]
    fn test_take_random_deletes_set() {
        let (_dir, mut queue) = temp_queue();
        queue.enqueue(&[5, 10]).unwrap();

        assert_eq!(queue.take_random().unwrap(), vec![5, 10]);
        assert_eq!(queue.size().unwrap(), 0);
        assert!(matches!(queue.take_random(), Err(QueueError::PoolExhausted)));
    }

    #[test]
    fn test_take_random_on_empty_queue() {
        let (_dir, mut queue) = temp_queue();
        assert!(matches!(queue.take_random(), Err(QueueError::PoolExhausted)));
    }

    #[test]
    fn test_every_set_returned_exactly_once() {
        let (_dir, mut queue) = temp_queue();
        for word in 1..=20u32 {
            queue.enqueue(&[word]).unwrap();
        }

        let mut seen: Vec<u32> = (0..20).map(|_| queue.take_random().unwrap()[0]).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=20).collect::<Vec<_>>());
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_size_ignores_foreign_files() {
        let (dir, mut queue) = temp_queue();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        queue.enqueue(&[7]).unwrap();
        assert_eq!(queue.size().unwrap(), 1);
    }

    #[test]
    fn test_size_sees_external_deletion() {
        let (_dir, mut queue) = temp_queue();
        let path = queue.enqueue(&[7]).unwrap();
        fs::remove_file(path).unwrap();
        assert_eq!(queue.size().unwrap(), 0);
    }

    #[test]
    fn test_malformed_set_is_fatal() {
        let (dir, mut queue) = temp_queue();
        fs::write(dir.path().join("hotbits_broken.json"), "{\"integerList\": [1,").unwrap();

        assert!(matches!(
            queue.take_random(),
            Err(QueueError::MalformedSet { .. })
        ));
        // The broken set was removed rather than left to be retried
        assert_eq!(queue.size().unwrap(), 0);
    }

    #[test]
    fn test_enqueue_rejects_zero_word() {
        let (_dir, mut queue) = temp_queue();
        assert!(matches!(
            queue.enqueue(&[1, 0]),
            Err(QueueError::InvalidSet(_))
        ));
        assert_eq!(queue.size().unwrap(), 0);
    }
}
