// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! File-backed scratch store
//!
//! Each key maps to a file under the root directory; `/` in a key becomes a
//! subdirectory. Writes go to a temporary sibling first and are renamed into
//! place so a concurrent reader never observes a half-written snapshot.

use super::traits::ScratchStore;
use super::types::{validate_key, ScratchResult, ScratchType};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub struct FileScratch {
    root: PathBuf,
}

impl FileScratch {
    /// Open a file store rooted at `root`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(root: P) -> ScratchResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> ScratchResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn ensure_parent(path: &Path) -> ScratchResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ScratchStore for FileScratch {
    fn read(&self, key: &str) -> ScratchResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> ScratchResult<()> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(value)?;
            tmp.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn write_if_absent(&self, key: &str, value: &[u8]) -> ScratchResult<bool> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(value)?;
                file.sync_all()?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> ScratchResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn contains_key(&self, key: &str) -> ScratchResult<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    fn scratch_type(&self) -> ScratchType {
        ScratchType::File
    }
}
