// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Reconstruct the history of one branch path.
//!
//! The source walk proceeds backward in time and across copy boundaries;
//! each step is mapped to a revision id and the result is reversed to
//! oldest-first. Re-running against an unchanged source always yields an
//! identical sequence.

use failure::Fallible;

use svn_types::{generate_revision_id, BranchPath, BranchPathBuf, RevNum, RevisionId};
use svnrepo::SvnSource;

use crate::scheme::BranchingScheme;

/// One step of a reconstructed branch history: the revision number and the
/// path the branch lived at in that revision.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HistoryEntry {
    pub revnum: RevNum,
    pub path: BranchPathBuf,
}

/// The raw walk, newest first. A branch that never existed below
/// `upper_revnum` yields an empty sequence: that is genesis, not an error.
pub fn history_entries(
    source: &dyn SvnSource,
    branch_path: &BranchPath,
    upper_revnum: RevNum,
) -> Fallible<Vec<HistoryEntry>> {
    let mut entries = Vec::new();
    for entry in source.follow_history(branch_path, upper_revnum)? {
        let entry = entry?;
        entries.push(HistoryEntry {
            revnum: entry.revnum,
            path: entry.path,
        });
    }
    Ok(entries)
}

/// The branch's revision ids, oldest first.
pub fn build_history(
    source: &dyn SvnSource,
    branch_path: &BranchPath,
    upper_revnum: RevNum,
    scheme: &BranchingScheme,
) -> Fallible<Vec<RevisionId>> {
    let tag = scheme.tag();
    let mut ids: Vec<RevisionId> = history_entries(source, branch_path, upper_revnum)?
        .into_iter()
        .map(|entry| generate_revision_id(entry.revnum, &entry.path, &tag))
        .collect();
    ids.reverse();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    use svnrepo::{MemSvnRepo, NodeOp};

    fn path(s: &str) -> BranchPathBuf {
        BranchPathBuf::from_string(s.to_string()).unwrap()
    }

    fn repo_with_copied_branch() -> MemSvnRepo {
        let mut repo = MemSvnRepo::new("uuid");
        repo.commit(vec![
            (path("trunk"), NodeOp::AddDir),
            (path("trunk/foo"), NodeOp::AddFile),
        ])
        .unwrap();
        repo.commit(vec![(path("trunk/foo"), NodeOp::Modify)]).unwrap();
        repo.commit(vec![
            (path("branches"), NodeOp::AddDir),
            (
                path("branches/feature"),
                NodeOp::Copy {
                    from: path("trunk"),
                    from_rev: 2,
                },
            ),
        ])
        .unwrap();
        repo
    }

    #[test]
    fn test_history_is_oldest_first_and_follows_copies() {
        let repo = repo_with_copied_branch();
        let scheme = BranchingScheme::default();
        let history = build_history(&repo, &path("branches/feature"), 3, &scheme).unwrap();
        let rendered: Vec<&str> = history.iter().map(|id| id.as_str()).collect();
        assert_eq!(
            rendered,
            vec![
                "svn-v1-trunk0:trunk:1",
                "svn-v1-trunk0:trunk:2",
                "svn-v1-trunk0:branches/feature:3",
            ]
        );
    }

    #[test]
    fn test_build_history_is_idempotent() {
        let repo = repo_with_copied_branch();
        let scheme = BranchingScheme::default();
        let first = build_history(&repo, &path("branches/feature"), 3, &scheme).unwrap();
        let second = build_history(&repo, &path("branches/feature"), 3, &scheme).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_path_yields_empty_history() {
        let repo = repo_with_copied_branch();
        let scheme = BranchingScheme::default();
        let history = build_history(&repo, &path("branches/nope"), 3, &scheme).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_bounded_walk_ignores_later_revisions() {
        let repo = repo_with_copied_branch();
        let scheme = BranchingScheme::default();
        let history = build_history(&repo, &path("trunk"), 1, &scheme).unwrap();
        let rendered: Vec<&str> = history.iter().map(|id| id.as_str()).collect();
        assert_eq!(rendered, vec!["svn-v1-trunk0:trunk:1"]);
    }
}
