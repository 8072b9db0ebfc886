// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Generic, in-memory destination store backed by HashMaps, intended to be
//! used in tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use failure::Fallible;

use svn_types::{BranchPath, RevisionId};

use crate::errors::ErrorKind;
use crate::{ensure_fast_forward, Container, DagStore, SharedRepository, TargetBranch};

#[derive(Default)]
struct BranchState {
    history: Vec<RevisionId>,
    parent: Option<String>,
}

#[derive(Default)]
struct ContainerState {
    branch: Option<BranchState>,
    working_copy: bool,
}

#[derive(Default)]
struct Inner {
    containers: HashMap<String, ContainerState>,
    fetched: BTreeSet<RevisionId>,
    fetched_all: bool,
    shared_repository: bool,
    make_working_copies: bool,
}

#[derive(Clone, Default)]
pub struct MemDagStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemDagStore {
    pub fn new() -> MemDagStore {
        Default::default()
    }

    // Inspection helpers for tests and summaries.

    pub fn branch_history(&self, path: &BranchPath) -> Option<Vec<RevisionId>> {
        let inner = self.inner.lock().expect("poisoned lock");
        inner
            .containers
            .get(path.as_str())
            .and_then(|container| container.branch.as_ref())
            .map(|branch| branch.history.clone())
    }

    pub fn branch_parent(&self, path: &BranchPath) -> Option<String> {
        let inner = self.inner.lock().expect("poisoned lock");
        inner
            .containers
            .get(path.as_str())
            .and_then(|container| container.branch.as_ref())
            .and_then(|branch| branch.parent.clone())
    }

    pub fn branch_paths(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("poisoned lock");
        let mut paths: Vec<String> = inner
            .containers
            .iter()
            .filter(|(_, container)| container.branch.is_some())
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    pub fn has_working_copy(&self, path: &BranchPath) -> bool {
        let inner = self.inner.lock().expect("poisoned lock");
        inner
            .containers
            .get(path.as_str())
            .map(|container| container.working_copy)
            .unwrap_or(false)
    }

    pub fn fetched(&self) -> BTreeSet<RevisionId> {
        self.inner.lock().expect("poisoned lock").fetched.clone()
    }

    pub fn fetched_all(&self) -> bool {
        self.inner.lock().expect("poisoned lock").fetched_all
    }

    pub fn has_shared_repository(&self) -> bool {
        self.inner.lock().expect("poisoned lock").shared_repository
    }
}

impl DagStore for MemDagStore {
    fn open_or_create_container(&self, path: &BranchPath) -> Fallible<Box<dyn Container>> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        inner
            .containers
            .entry(path.as_str().to_string())
            .or_insert_with(Default::default);
        Ok(Box::new(MemContainer {
            inner: Arc::clone(&self.inner),
            path: path.as_str().to_string(),
        }))
    }

    fn open_or_create_shared_repository(&self) -> Fallible<Box<dyn SharedRepository>> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        inner.shared_repository = true;
        Ok(Box::new(MemSharedRepository {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn set_make_working_copies(&self, enabled: bool) -> Fallible<()> {
        self.inner.lock().expect("poisoned lock").make_working_copies = enabled;
        Ok(())
    }
}

struct MemContainer {
    inner: Arc<Mutex<Inner>>,
    path: String,
}

impl MemContainer {
    fn branch_handle(&self) -> Box<dyn TargetBranch> {
        Box::new(MemBranch {
            inner: Arc::clone(&self.inner),
            path: self.path.clone(),
        })
    }
}

impl Container for MemContainer {
    fn open_branch(&self) -> Fallible<Option<Box<dyn TargetBranch>>> {
        let inner = self.inner.lock().expect("poisoned lock");
        let present = inner
            .containers
            .get(&self.path)
            .map(|container| container.branch.is_some())
            .unwrap_or(false);
        drop(inner);
        Ok(if present {
            Some(self.branch_handle())
        } else {
            None
        })
    }

    fn create_branch(&self) -> Fallible<Box<dyn TargetBranch>> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        let container = inner
            .containers
            .entry(self.path.clone())
            .or_insert_with(Default::default);
        if container.branch.is_some() {
            return Err(ErrorKind::BranchExists(self.path.clone()).into());
        }
        container.branch = Some(Default::default());
        drop(inner);
        Ok(self.branch_handle())
    }

    fn has_working_copy(&self) -> Fallible<bool> {
        let inner = self.inner.lock().expect("poisoned lock");
        Ok(inner
            .containers
            .get(&self.path)
            .map(|container| container.working_copy)
            .unwrap_or(false))
    }

    fn create_working_copy(&self) -> Fallible<()> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        if let Some(container) = inner.containers.get_mut(&self.path) {
            container.working_copy = true;
        }
        Ok(())
    }
}

struct MemBranch {
    inner: Arc<Mutex<Inner>>,
    path: String,
}

impl MemBranch {
    fn with_state<T>(&self, f: impl FnOnce(&mut BranchState) -> T) -> Fallible<T> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        let state = inner
            .containers
            .get_mut(&self.path)
            .and_then(|container| container.branch.as_mut());
        match state {
            Some(state) => Ok(f(state)),
            None => Err(ErrorKind::CorruptBranchState(
                self.path.clone(),
                "branch vanished from the store".to_string(),
            )
            .into()),
        }
    }
}

impl TargetBranch for MemBranch {
    fn last_revision(&self) -> Fallible<RevisionId> {
        self.with_state(|state| {
            state
                .history
                .last()
                .cloned()
                .unwrap_or_else(RevisionId::null)
        })
    }

    fn revision_history(&self) -> Fallible<Vec<RevisionId>> {
        self.with_state(|state| state.history.clone())
    }

    fn set_revision_history(&mut self, history: Vec<RevisionId>) -> Fallible<()> {
        self.with_state(|state| state.history = history)
    }

    fn pull(&mut self, source_history: &[RevisionId]) -> Fallible<()> {
        let path = self.path.clone();
        self.with_state(|state| {
            ensure_fast_forward(&path, &state.history, source_history)?;
            state.history = source_history.to_vec();
            Ok(())
        })?
    }

    fn parent(&self) -> Fallible<Option<String>> {
        self.with_state(|state| state.parent.clone())
    }

    fn set_parent(&mut self, url: &str) -> Fallible<()> {
        let url = url.to_string();
        self.with_state(|state| state.parent = Some(url))
    }
}

struct MemSharedRepository {
    inner: Arc<Mutex<Inner>>,
}

impl SharedRepository for MemSharedRepository {
    fn fetch(&self, tips: &[RevisionId]) -> Fallible<()> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        for tip in tips {
            inner.fetched.insert(tip.clone());
        }
        Ok(())
    }

    fn fetch_all(&self) -> Fallible<()> {
        self.inner.lock().expect("poisoned lock").fetched_all = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use svn_types::BranchPathBuf;

    fn path(s: &str) -> BranchPathBuf {
        BranchPathBuf::from_string(s.to_string()).unwrap()
    }

    fn id(s: &str) -> RevisionId {
        RevisionId::from_string(s.to_string())
    }

    #[test]
    fn test_container_and_branch_lifecycle() {
        let store = MemDagStore::new();
        let container = store.open_or_create_container(&path("trunk")).unwrap();
        assert!(container.open_branch().unwrap().is_none());

        let mut branch = container.create_branch().unwrap();
        assert!(container.create_branch().is_err());
        assert!(branch.last_revision().unwrap().is_null());

        branch.set_parent("svn+mem://uuid/trunk").unwrap();
        branch.pull(&[id("a"), id("b")]).unwrap();
        assert_eq!(branch.last_revision().unwrap(), id("b"));

        // Re-opening sees the same state.
        let reopened = store.open_or_create_container(&path("trunk")).unwrap();
        let branch = reopened.open_branch().unwrap().unwrap();
        assert_eq!(branch.revision_history().unwrap(), vec![id("a"), id("b")]);
        assert_eq!(
            branch.parent().unwrap(),
            Some("svn+mem://uuid/trunk".to_string())
        );
    }

    #[test]
    fn test_pull_requires_fast_forward() {
        let store = MemDagStore::new();
        let container = store.open_or_create_container(&path("trunk")).unwrap();
        let mut branch = container.create_branch().unwrap();
        branch.pull(&[id("a"), id("b")]).unwrap();

        assert!(branch.pull(&[id("x"), id("y")]).is_err());
        assert!(branch.pull(&[id("a")]).is_err());

        branch.set_revision_history(Vec::new()).unwrap();
        branch.pull(&[id("x"), id("y")]).unwrap();
        assert_eq!(branch.revision_history().unwrap(), vec![id("x"), id("y")]);
    }

    #[test]
    fn test_working_copy_flag() {
        let store = MemDagStore::new();
        let container = store.open_or_create_container(&path("trunk")).unwrap();
        assert!(!container.has_working_copy().unwrap());
        container.create_working_copy().unwrap();
        assert!(container.has_working_copy().unwrap());
        assert!(store.has_working_copy(&path("trunk")));
    }

    #[test]
    fn test_shared_repository_fetch() {
        let store = MemDagStore::new();
        let shared = store.open_or_create_shared_repository().unwrap();
        shared.fetch(&[id("a"), id("b")]).unwrap();
        assert_eq!(store.fetched().len(), 2);
        assert!(!store.fetched_all());
        shared.fetch_all().unwrap();
        assert!(store.fetched_all());
    }
}
