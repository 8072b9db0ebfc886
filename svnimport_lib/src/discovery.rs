// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Enumerate candidate branch paths as of a given revision.
//!
//! One backward walk over the whole repository history attributes every
//! changed path to a branch via the scheme; the first (newest) sighting of
//! each branch wins. Candidates are re-validated against the tree at
//! `as_of`: deleted branches are reported with `exists = false` for the
//! caller's predicate to filter, paths that turn out to be files are
//! silently dropped.

use std::collections::BTreeMap;

use failure::Fallible;
use slog::{debug, Logger};

use svn_types::{BranchPathBuf, NodeKind, RevNum};
use svnrepo::SvnSource;

use crate::scheme::BranchingScheme;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BranchCandidate {
    pub path: BranchPathBuf,
    /// The newest revision at or below `as_of` that touched the branch.
    pub revnum: RevNum,
    pub exists: bool,
}

/// Ordering of the result is stable (sorted by path) for reproducible
/// logs; it is insignificant to correctness.
pub fn find_branchpaths(
    source: &dyn SvnSource,
    scheme: &BranchingScheme,
    as_of: RevNum,
    logger: &Logger,
) -> Fallible<Vec<BranchCandidate>> {
    let mut newest: BTreeMap<BranchPathBuf, RevNum> = BTreeMap::new();
    for entry in source.follow_history(svn_types::BranchPath::root(), as_of)? {
        let entry = entry?;
        for changed in entry.changed_paths.keys() {
            if let Some(branch_path) = scheme.branch_path_of(changed) {
                // The walk is newest-first; keep the first sighting.
                newest.entry(branch_path).or_insert(entry.revnum);
            }
        }
    }

    let mut candidates = Vec::new();
    for (path, revnum) in newest {
        match source.check_path(&path, as_of)? {
            Some(NodeKind::Directory) => candidates.push(BranchCandidate {
                path,
                revnum,
                exists: true,
            }),
            Some(NodeKind::File) => {
                debug!(logger, "ignoring branch candidate {}: not a directory", path);
            }
            None => candidates.push(BranchCandidate {
                path,
                revnum,
                exists: false,
            }),
        }
    }
    Ok(candidates)
}
