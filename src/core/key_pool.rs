//! Ordered pool of interchangeable API keys with a shared rotation cursor.

use crate::utils::error::{Result, ScoutError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyPool {
    /// Builds a pool from raw keys; blank entries are dropped.
    pub fn new(keys: impl IntoIterator<Item = String>) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(ScoutError::EmptyKeyPool {
                path: "<inline>".to_string(),
            });
        }

        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Loads one key per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let pool = Self::new(content.lines().map(str::to_string)).map_err(|_| {
            ScoutError::EmptyKeyPool {
                path: path.display().to_string(),
            }
        })?;

        tracing::info!("Loaded {} API keys from {}", pool.len(), path.display());
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub fn key_at(&self, index: usize) -> &str {
        &self.keys[index % self.keys.len()]
    }

    /// Rotates away from `observed`, the index the caller just failed with.
    ///
    /// If another caller already moved the cursor, the cursor is left alone
    /// and its current value is returned.
    pub fn advance_from(&self, observed: usize) -> usize {
        let next = (observed + 1) % self.keys.len();
        match self
            .cursor
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => next,
            Err(current) => current,
        }
    }
}

/// First 12 characters of a key followed by `...`.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(12).collect();
    format!("{}...", prefix)
}
