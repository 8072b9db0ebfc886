// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! A read-only view of one branch in the source repository.
//!
//! The view snapshots its history once at construction and never observes
//! later source commits; re-construct it to see them. Only the ingestion
//! pipeline on the source side ever produces new revisions, so every
//! history-mutating operation is rejected, and locking is a no-op because
//! concurrency control is owned by the source system.

use failure::Fallible;

use svn_types::{BranchPathBuf, RevNum, RevisionId};
use svnrepo::{SvnSource, TreeSnapshot};

use crate::errors::ErrorKind;
use crate::history::build_history;
use crate::scheme::BranchingScheme;

pub struct SvnBranch<'a> {
    source: &'a dyn SvnSource,
    branch_path: BranchPathBuf,
    upper_revnum: RevNum,
    history: Vec<RevisionId>,
}

impl<'a> SvnBranch<'a> {
    /// Bind a branch path and compute its history as of `upper_revnum`.
    pub fn open(
        source: &'a dyn SvnSource,
        branch_path: BranchPathBuf,
        upper_revnum: RevNum,
        scheme: &BranchingScheme,
    ) -> Fallible<SvnBranch<'a>> {
        let history = build_history(source, &branch_path, upper_revnum, scheme)?;
        Ok(SvnBranch {
            source,
            branch_path,
            upper_revnum,
            history,
        })
    }

    pub fn branch_path(&self) -> &BranchPathBuf {
        &self.branch_path
    }

    /// The snapshot taken at construction, oldest first.
    pub fn revision_history(&self) -> &[RevisionId] {
        &self.history
    }

    pub fn last_revision(&self) -> RevisionId {
        self.history
            .last()
            .cloned()
            .unwrap_or_else(RevisionId::null)
    }

    /// Last path segment, for display only.
    pub fn nickname(&self) -> &str {
        self.branch_path.last_component().unwrap_or("")
    }

    pub fn url(&self) -> String {
        if self.branch_path.is_root() {
            self.source.url().to_string()
        } else {
            format!("{}/{}", self.source.url(), self.branch_path)
        }
    }

    /// Identity of the tree root at the branch tip.
    pub fn root_identifier(&self) -> Fallible<String> {
        self.source
            .root_identifier(&self.branch_path, self.upper_revnum)
    }

    /// A read view of the tree at the branch tip, materialized on demand by
    /// the source access layer.
    pub fn basis_snapshot(&self) -> Fallible<TreeSnapshot> {
        self.source.snapshot(&self.branch_path, self.upper_revnum)
    }

    // The source repository is the sole writer; every mutator below is
    // rejected outright.

    pub fn set_revision_history(&mut self, _history: Vec<RevisionId>) -> Fallible<()> {
        Err(unsupported("set_revision_history"))
    }

    pub fn pull(&mut self, _other: &SvnBranch) -> Fallible<()> {
        Err(unsupported("pull"))
    }

    pub fn append_revision(&mut self, _id: RevisionId) -> Fallible<()> {
        Err(unsupported("append_revision"))
    }

    pub fn set_parent(&mut self, _url: &str) -> Fallible<()> {
        Err(unsupported("set_parent"))
    }

    pub fn push_stores(&mut self, _other: &SvnBranch) -> Fallible<()> {
        Err(unsupported("push_stores"))
    }

    pub fn lock_read(&self) {}

    pub fn lock_write(&self) {}

    pub fn unlock(&self) {}

    pub fn physical_lock_status(&self) -> bool {
        false
    }
}

fn unsupported(op: &'static str) -> failure::Error {
    ErrorKind::UnsupportedOperation(op).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    use svn_types::NodeKind;
    use svnrepo::{MemSvnRepo, NodeOp};

    fn path(s: &str) -> BranchPathBuf {
        BranchPathBuf::from_string(s.to_string()).unwrap()
    }

    fn repo() -> MemSvnRepo {
        let mut repo = MemSvnRepo::new("uuid");
        repo.commit(vec![
            (path("trunk"), NodeOp::AddDir),
            (path("trunk/foo"), NodeOp::AddFile),
        ])
        .unwrap();
        repo.commit(vec![(path("trunk/foo"), NodeOp::Modify)]).unwrap();
        repo
    }

    #[test]
    fn test_open_snapshots_history() {
        let repo = repo();
        let scheme = BranchingScheme::default();
        let branch = SvnBranch::open(&repo, path("trunk"), 2, &scheme).unwrap();
        assert_eq!(branch.revision_history().len(), 2);
        assert_eq!(branch.last_revision().as_str(), "svn-v1-trunk0:trunk:2");
        assert_eq!(branch.nickname(), "trunk");
        assert_eq!(branch.url(), "svn+mem://uuid/trunk");
    }

    #[test]
    fn test_empty_branch_has_null_tip() {
        let repo = repo();
        let scheme = BranchingScheme::default();
        let branch = SvnBranch::open(&repo, path("branches/none"), 2, &scheme).unwrap();
        assert!(branch.last_revision().is_null());
        assert!(branch.revision_history().is_empty());
    }

    #[test]
    fn test_mutators_are_unsupported() {
        let repo = repo();
        let scheme = BranchingScheme::default();
        let mut branch = SvnBranch::open(&repo, path("trunk"), 2, &scheme).unwrap();
        assert!(branch.set_revision_history(Vec::new()).is_err());
        assert!(branch.append_revision(RevisionId::null()).is_err());
        assert!(branch.set_parent("elsewhere").is_err());

        let other = SvnBranch::open(&repo, path("trunk"), 1, &scheme).unwrap();
        let mut branch = SvnBranch::open(&repo, path("trunk"), 2, &scheme).unwrap();
        assert!(branch.pull(&other).is_err());
        assert!(branch.push_stores(&other).is_err());
    }

    #[test]
    fn test_locks_are_noops() {
        let repo = repo();
        let scheme = BranchingScheme::default();
        let branch = SvnBranch::open(&repo, path("trunk"), 2, &scheme).unwrap();
        branch.lock_read();
        branch.lock_write();
        branch.unlock();
        assert!(!branch.physical_lock_status());
    }

    #[test]
    fn test_basis_snapshot_and_root_identifier() {
        let repo = repo();
        let scheme = BranchingScheme::default();
        let branch = SvnBranch::open(&repo, path("trunk"), 2, &scheme).unwrap();
        let snapshot = branch.basis_snapshot().unwrap();
        assert_eq!(snapshot.kind(&path("foo")), Some(NodeKind::File));
        assert!(branch.root_identifier().unwrap().contains("trunk"));
    }
}
