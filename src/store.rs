//! Persisted, ordered list of alarm rules.
//!
//! The file is a JSON array of `{"time", "text", "days"}` objects kept in
//! insertion order. Every change is written through immediately.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    alarm::AlarmRule,
    error::{Error, Result},
};

#[derive(Debug)]
pub struct AlarmStore {
    path: PathBuf,
    rules: Vec<AlarmRule>,
}

impl AlarmStore {
    /// Opens the store backed by `path`, loading whatever is already there.
    ///
    /// # Errors
    /// if the file exists but can't be read or parsed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rules = Self::load(&path)?;
        info!("loaded {} alarm(s) from {}", rules.len(), path.display());
        Ok(Self { path, rules })
    }

    /// Reads the alarms in `path`. A missing file is an empty list.
    ///
    /// # Errors
    /// if the file exists but can't be read or parsed
    pub fn load(path: &Path) -> Result<Vec<AlarmRule>> {
        if !path.exists() {
            debug!("no alarms file at {}", path.display());
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadAlarms {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| Error::ParseAlarms {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Copies `seed` to `path` when nothing is stored at `path` yet.
    /// Returns whether a copy happened.
    ///
    /// # Errors
    /// if the copy fails
    pub fn seed(path: &Path, seed: &Path) -> Result<bool> {
        if path.exists() || !seed.exists() {
            return Ok(false);
        }
        let write_err = |source: std::io::Error| Error::WriteAlarms {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::copy(seed, path).map_err(write_err)?;
        info!("seeded {} from {}", path.display(), seed.display());
        Ok(true)
    }

    /// Overwrites the file with the current list.
    ///
    /// # Errors
    /// if the directory or file can't be written
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string(&self.rules).map_err(Error::SerializeAlarms)?;
        let write_err = |source: std::io::Error| Error::WriteAlarms {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, json).map_err(write_err)?;
        debug!("saved {} alarm(s) to {}", self.rules.len(), self.path.display());
        Ok(())
    }

    /// Appends `rule` and persists. On a failed write the rule is not kept.
    ///
    /// # Errors
    /// if the list can't be written
    pub fn add(&mut self, rule: AlarmRule) -> Result<()> {
        self.rules.push(rule);
        if let Err(e) = self.save() {
            self.rules.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Removes the rule at `index` and persists, returning it.
    /// On a failed write the rule is put back.
    ///
    /// # Errors
    /// `OutOfRange` if there is no rule at `index`, or if the list can't be written
    pub fn delete_at(&mut self, index: usize) -> Result<AlarmRule> {
        if index >= self.rules.len() {
            return Err(Error::OutOfRange {
                index,
                len: self.rules.len(),
            });
        }
        let rule = self.rules.remove(index);
        if let Err(e) = self.save() {
            self.rules.insert(index, rule);
            return Err(e);
        }
        Ok(rule)
    }

    #[must_use]
    pub fn rules(&self) -> &[AlarmRule] {
        &self.rules
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
