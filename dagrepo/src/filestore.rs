// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! A basic file-based persistent destination store.
//!
//! Containers are plain directories mirroring branch paths under the store
//! root; each branch keeps its state in a single TOML file under a `.dag`
//! subdirectory, rewritten atomically via a temporary file. The store is
//! exclusively owned by one conversion pass at a time, so no cross-process
//! locking is attempted.

use std::fs;
use std::path::{Path, PathBuf};

use failure::Fallible;
use serde_derive::{Deserialize, Serialize};

use svn_types::{BranchPath, RevisionId};

use crate::errors::ErrorKind;
use crate::{ensure_fast_forward, Container, DagStore, SharedRepository, TargetBranch};

const STATE_DIR: &str = ".dag";
const BRANCH_FILE: &str = "branch.toml";
const SHARED_FILE: &str = "shared.toml";
const STORE_FILE: &str = "store.toml";
const CHECKOUT_DIR: &str = "checkout";

#[derive(Debug, Default, Deserialize, Serialize)]
struct BranchStateFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(default)]
    history: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SharedStateFile {
    #[serde(default)]
    fetch_all: bool,
    #[serde(default)]
    fetched: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct StoreStateFile {
    #[serde(default)]
    make_working_copies: bool,
}

fn write_state<T: serde::Serialize>(file: &Path, state: &T) -> Fallible<()> {
    let rendered = toml::to_string(state)?;
    let tmp = file.with_extension("toml.tmp");
    fs::write(&tmp, rendered)?;
    fs::rename(&tmp, file)?;
    Ok(())
}

fn read_state<T: serde::de::DeserializeOwned>(file: &Path) -> Fallible<T> {
    let raw = fs::read_to_string(file)?;
    toml::from_str(&raw).map_err(|err| {
        ErrorKind::CorruptBranchState(file.display().to_string(), err.to_string()).into()
    })
}

pub struct FileDagStore {
    root: PathBuf,
}

impl FileDagStore {
    pub fn open<P: Into<PathBuf>>(root: P) -> Fallible<FileDagStore> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FileDagStore { root })
    }

    fn container_dir(&self, path: &BranchPath) -> PathBuf {
        let mut dir = self.root.clone();
        for component in path.components() {
            dir.push(component);
        }
        dir
    }

    fn state_file(&self, name: &str) -> PathBuf {
        self.root.join(STATE_DIR).join(name)
    }
}

impl DagStore for FileDagStore {
    fn open_or_create_container(&self, path: &BranchPath) -> Fallible<Box<dyn Container>> {
        let dir = self.container_dir(path);
        fs::create_dir_all(&dir)?;
        Ok(Box::new(FileContainer {
            dir,
            location: path.as_str().to_string(),
        }))
    }

    fn open_or_create_shared_repository(&self) -> Fallible<Box<dyn SharedRepository>> {
        fs::create_dir_all(self.root.join(STATE_DIR))?;
        let file = self.state_file(SHARED_FILE);
        if !file.exists() {
            write_state(&file, &SharedStateFile::default())?;
        }
        Ok(Box::new(FileSharedRepository { file }))
    }

    fn set_make_working_copies(&self, enabled: bool) -> Fallible<()> {
        fs::create_dir_all(self.root.join(STATE_DIR))?;
        write_state(
            &self.state_file(STORE_FILE),
            &StoreStateFile {
                make_working_copies: enabled,
            },
        )
    }
}

struct FileContainer {
    dir: PathBuf,
    location: String,
}

impl FileContainer {
    fn branch_file(&self) -> PathBuf {
        self.dir.join(STATE_DIR).join(BRANCH_FILE)
    }

    fn branch_handle(&self) -> Box<dyn TargetBranch> {
        Box::new(FileBranch {
            file: self.branch_file(),
            location: self.location.clone(),
        })
    }
}

impl Container for FileContainer {
    fn open_branch(&self) -> Fallible<Option<Box<dyn TargetBranch>>> {
        if self.branch_file().exists() {
            Ok(Some(self.branch_handle()))
        } else {
            Ok(None)
        }
    }

    fn create_branch(&self) -> Fallible<Box<dyn TargetBranch>> {
        let file = self.branch_file();
        if file.exists() {
            return Err(ErrorKind::BranchExists(self.location.clone()).into());
        }
        fs::create_dir_all(self.dir.join(STATE_DIR))?;
        write_state(&file, &BranchStateFile::default())?;
        Ok(self.branch_handle())
    }

    fn has_working_copy(&self) -> Fallible<bool> {
        Ok(self.dir.join(STATE_DIR).join(CHECKOUT_DIR).exists())
    }

    fn create_working_copy(&self) -> Fallible<()> {
        fs::create_dir_all(self.dir.join(STATE_DIR).join(CHECKOUT_DIR))?;
        Ok(())
    }
}

struct FileBranch {
    file: PathBuf,
    location: String,
}

impl FileBranch {
    fn load(&self) -> Fallible<BranchStateFile> {
        read_state(&self.file)
    }

    fn store(&self, state: &BranchStateFile) -> Fallible<()> {
        write_state(&self.file, state)
    }
}

impl TargetBranch for FileBranch {
    fn last_revision(&self) -> Fallible<RevisionId> {
        let state = self.load()?;
        Ok(state
            .history
            .last()
            .map(|id| RevisionId::from_string(id.clone()))
            .unwrap_or_else(RevisionId::null))
    }

    fn revision_history(&self) -> Fallible<Vec<RevisionId>> {
        let state = self.load()?;
        Ok(state
            .history
            .into_iter()
            .map(RevisionId::from_string)
            .collect())
    }

    fn set_revision_history(&mut self, history: Vec<RevisionId>) -> Fallible<()> {
        let mut state = self.load()?;
        state.history = history.into_iter().map(|id| id.as_str().to_string()).collect();
        self.store(&state)
    }

    fn pull(&mut self, source_history: &[RevisionId]) -> Fallible<()> {
        let mut state = self.load()?;
        let current: Vec<RevisionId> = state
            .history
            .iter()
            .map(|id| RevisionId::from_string(id.clone()))
            .collect();
        ensure_fast_forward(&self.location, &current, source_history)?;
        state.history = source_history
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        self.store(&state)
    }

    fn parent(&self) -> Fallible<Option<String>> {
        Ok(self.load()?.parent)
    }

    fn set_parent(&mut self, url: &str) -> Fallible<()> {
        let mut state = self.load()?;
        state.parent = Some(url.to_string());
        self.store(&state)
    }
}

struct FileSharedRepository {
    file: PathBuf,
}

impl SharedRepository for FileSharedRepository {
    fn fetch(&self, tips: &[RevisionId]) -> Fallible<()> {
        let mut state: SharedStateFile = read_state(&self.file)?;
        for tip in tips {
            if !state.fetched.iter().any(|seen| seen == tip.as_str()) {
                state.fetched.push(tip.as_str().to_string());
            }
        }
        write_state(&self.file, &state)
    }

    fn fetch_all(&self) -> Fallible<()> {
        let mut state: SharedStateFile = read_state(&self.file)?;
        state.fetch_all = true;
        write_state(&self.file, &state)
    }
}
