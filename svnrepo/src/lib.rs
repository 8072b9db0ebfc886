// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Read-only access to a Subversion-model source repository: a single
//! strictly-increasing revision counter over a tree of paths, where
//! branches are plain directories.
//!
//! The conversion core only consumes the `SvnSource` trait. `MemSvnRepo` is
//! the local implementation backing tests and dumpfile imports; a networked
//! implementation would live behind the same trait.

#![deny(warnings)]
#![allow(non_local_definitions)] // old failure_derive macro trips a newer lint

pub mod dump;
pub mod errors;
pub mod mem;

use std::collections::BTreeMap;

use failure::Fallible;

use svn_types::{BranchPath, BranchPathBuf, NodeKind, RevNum};

pub use crate::dump::load_dumpfile;
pub use crate::errors::ErrorKind;
pub use crate::mem::{MemSvnRepo, NodeOp};

/// How a path was touched in one revision.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeAction {
    Add,
    Modify,
    Delete,
    /// Deleted and re-added within one revision.
    Replace,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathChange {
    pub action: ChangeAction,
    /// For `Add`/`Replace`: the path and revision this node was copied from.
    pub copyfrom: Option<(BranchPathBuf, RevNum)>,
}

impl PathChange {
    pub fn new(action: ChangeAction) -> PathChange {
        PathChange {
            action,
            copyfrom: None,
        }
    }

    pub fn copied(action: ChangeAction, from: BranchPathBuf, from_rev: RevNum) -> PathChange {
        PathChange {
            action,
            copyfrom: Some((from, from_rev)),
        }
    }
}

/// One step of a backward history walk.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogEntry {
    /// The path the walked branch lived at in this revision. Differs from
    /// the starting path once the walk crosses a copy or rename boundary.
    pub path: BranchPathBuf,
    pub revnum: RevNum,
    /// Every path touched in this revision, not just those under `path`.
    pub changed_paths: BTreeMap<BranchPathBuf, PathChange>,
}

/// A read-only listing of the tree below some path at one revision. Paths
/// are relative to the snapshot root. File contents are not modeled; the
/// conversion core only needs tree shape.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreeSnapshot {
    pub revnum: RevNum,
    pub entries: BTreeMap<BranchPathBuf, NodeKind>,
}

impl TreeSnapshot {
    pub fn kind(&self, path: &BranchPath) -> Option<NodeKind> {
        if path.is_root() {
            return Some(NodeKind::Directory);
        }
        self.entries.get(path).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type HistoryIter<'a> = Box<dyn Iterator<Item = Fallible<LogEntry>> + 'a>;

/// The source repository access layer.
///
/// The repository is append-only and externally owned: it may gain revisions
/// between calls, which callers tolerate by pinning the revision numbers
/// they work against.
pub trait SvnSource {
    fn uuid(&self) -> &str;

    fn url(&self) -> &str;

    fn latest_revnum(&self) -> Fallible<RevNum>;

    /// The kind of the node at `path` in `revnum`, or `None` if absent.
    fn check_path(&self, path: &BranchPath, revnum: RevNum) -> Fallible<Option<NodeKind>>;

    /// Walk backward from `revnum` through every revision that modified
    /// `path` (or the path it was copied from, across copy and rename
    /// boundaries), newest first, ending at the path's genesis or revision
    /// zero. The sequence is finite, lazy and not restartable mid-stream; a
    /// fresh call re-walks from the start.
    ///
    /// A path that does not exist at `revnum` yields an empty walk; that is
    /// branch genesis, not an error.
    fn follow_history<'a>(&'a self, path: &BranchPath, revnum: RevNum)
        -> Fallible<HistoryIter<'a>>;

    /// A stable identity for the tree root at `path` in `revnum`, tied to
    /// the node incarnation (a deleted and re-created directory gets a new
    /// identity).
    fn root_identifier(&self, path: &BranchPath, revnum: RevNum) -> Fallible<String>;

    /// Materialize a read-only view of the tree below `path` at `revnum`.
    fn snapshot(&self, path: &BranchPath, revnum: RevNum) -> Fallible<TreeSnapshot>;
}
