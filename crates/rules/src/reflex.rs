//! Declarative reflexes built from `[[reflexes]]` entries.

use async_trait::async_trait;
use deliberate_config::EffectConfig;
use deliberate_core::{ActionError, Reflex, WorkingMemory};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::effects;

/// Fires once for every file that appears in a directory.
///
/// Files already present when the reflex is created count as new. The set
/// of handled files lives in the reflex.
pub struct WatchDir {
    name: String,
    path: PathBuf,
    effects: Vec<EffectConfig>,
    seen: HashSet<PathBuf>,
    pending: Vec<PathBuf>,
}

impl WatchDir {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, effects: &[EffectConfig]) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            effects: effects.to_vec(),
            seen: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Number of files handled so far.
    pub fn handled(&self) -> usize {
        self.seen.len()
    }

    async fn scan(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut dir = tokio::fs::read_dir(&self.path).await?;
        let mut fresh = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && !self.seen.contains(&path) {
                fresh.push(path);
            }
        }
        fresh.sort();
        Ok(fresh)
    }
}

#[async_trait]
impl Reflex for WatchDir {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&mut self) -> bool {
        match self.scan().await {
            Ok(fresh) => {
                self.pending = fresh;
                !self.pending.is_empty()
            }
            Err(e) => {
                debug!(reflex = %self.name, path = %self.path.display(), error = %e, "Directory scan failed");
                false
            }
        }
    }

    async fn act(&mut self, mut memory: Option<&mut WorkingMemory>) -> Result<(), ActionError> {
        for file in std::mem::take(&mut self.pending) {
            // Marked before the effects run so a failing file is not retried forever.
            self.seen.insert(file.clone());
            let mut vars = BTreeMap::new();
            vars.insert("file", file.display().to_string());
            vars.insert(
                "file_name",
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            effects::apply(&self.effects, memory.as_deref_mut(), &self.name, &vars).await?;
        }
        Ok(())
    }
}

/// Fires whenever `interval` has passed since it last fired.
pub struct Every {
    name: String,
    interval: Duration,
    effects: Vec<EffectConfig>,
    last: Instant,
}

impl Every {
    pub fn new(name: impl Into<String>, interval: Duration, effects: &[EffectConfig]) -> Self {
        Self {
            name: name.into(),
            interval,
            effects: effects.to_vec(),
            last: Instant::now(),
        }
    }
}

#[async_trait]
impl Reflex for Every {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            self.last = Instant::now();
            true
        } else {
            false
        }
    }

    async fn act(&mut self, memory: Option<&mut WorkingMemory>) -> Result<(), ActionError> {
        effects::apply(&self.effects, memory, &self.name, &BTreeMap::new()).await
    }
}
