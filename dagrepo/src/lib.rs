// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Destination storage for converted repositories: containers (one per
//! branch path) holding at most one branch each, plus an optional shared
//! multi-branch repository used for batched revision fetches.
//!
//! The conversion core only drives the traits below. Two implementations
//! ship in this crate: an in-memory store for tests and a file-backed store
//! persisting one state file per branch.

#![deny(warnings)]
#![allow(non_local_definitions)] // old failure_derive macro trips a newer lint

pub mod errors;
pub mod filestore;
pub mod mem;

use failure::Fallible;

use svn_types::{BranchPath, RevisionId};

pub use crate::errors::ErrorKind;
pub use crate::filestore::FileDagStore;
pub use crate::mem::MemDagStore;

/// A mutable branch in the destination. Its history is either extended by a
/// fast-forward `pull` or truncated via `set_revision_history(vec![])` and
/// rebuilt.
pub trait TargetBranch {
    /// The tip of the branch, or the null revision if the history is empty.
    fn last_revision(&self) -> Fallible<RevisionId>;

    fn revision_history(&self) -> Fallible<Vec<RevisionId>>;

    /// Replace the history wholesale. An empty vector resets the branch.
    fn set_revision_history(&mut self, history: Vec<RevisionId>) -> Fallible<()>;

    /// Advance the branch to `source_history`. The current history must be
    /// a prefix of it; anything else is refused, the caller reconciles and
    /// resets first.
    fn pull(&mut self, source_history: &[RevisionId]) -> Fallible<()>;

    /// Provenance pointer to the branch this one was converted from.
    fn parent(&self) -> Fallible<Option<String>>;

    fn set_parent(&mut self, url: &str) -> Fallible<()>;
}

/// A destination container rooted at one branch path.
pub trait Container {
    fn open_branch(&self) -> Fallible<Option<Box<dyn TargetBranch>>>;

    fn create_branch(&self) -> Fallible<Box<dyn TargetBranch>>;

    fn has_working_copy(&self) -> Fallible<bool>;

    fn create_working_copy(&self) -> Fallible<()>;
}

/// Shared multi-branch revision storage. Fetching is a performance
/// optimization ahead of the per-branch loop and never changes final
/// per-branch state.
pub trait SharedRepository {
    fn fetch(&self, tips: &[RevisionId]) -> Fallible<()>;

    fn fetch_all(&self) -> Fallible<()>;
}

pub trait DagStore {
    /// Open the container at `path`, creating it (and missing intermediate
    /// containers) if absent. Opening an existing container is not an error.
    fn open_or_create_container(&self, path: &BranchPath) -> Fallible<Box<dyn Container>>;

    fn open_or_create_shared_repository(&self) -> Fallible<Box<dyn SharedRepository>>;

    fn set_make_working_copies(&self, enabled: bool) -> Fallible<()>;
}

/// Shared fast-forward check for `TargetBranch::pull` implementations.
pub(crate) fn ensure_fast_forward(
    location: &str,
    current: &[RevisionId],
    incoming: &[RevisionId],
) -> Fallible<()> {
    if current.len() <= incoming.len() && current == &incoming[..current.len()] {
        Ok(())
    } else {
        Err(ErrorKind::NonFastForwardPull(location.to_string()).into())
    }
}
