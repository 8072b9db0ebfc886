// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Ancestry-based reconciliation of a source branch against its target.
//!
//! Only the two tips are ever compared, never whole graphs. Histories
//! reconstructed from the source are linear, so "t is an ancestor of the
//! source tip" reduces to membership in the source history. The decision is
//! binary and non-interactive: a diverged target means the branch path was
//! reused for an unrelated line of history, and the target gets reset and
//! rebuilt rather than merged.

use svn_types::RevisionId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reconciliation {
    /// The target tip is an ancestor of the source tip; append the missing
    /// suffix.
    Compatible,
    /// The target holds unrelated history; discard it and rebuild.
    Diverged,
}

/// Whether `candidate` is an ancestor of the tip of `history`. The null
/// revision is an ancestor of everything.
pub fn is_ancestor(candidate: &RevisionId, history: &[RevisionId]) -> bool {
    candidate.is_null() || history.contains(candidate)
}

/// Compare the target tip against the source branch's reconstructed
/// history. A tip that cannot be located in the source ancestry — foreign,
/// malformed, or simply missing — is conservatively `Diverged`: resetting
/// and rebuilding is safer than assuming compatibility.
pub fn reconcile(source_history: &[RevisionId], target_tip: &RevisionId) -> Reconciliation {
    if is_ancestor(target_tip, source_history) {
        Reconciliation::Compatible
    } else {
        Reconciliation::Diverged
    }
}

/// The revisions the target is missing, oldest first. Meaningful only after
/// `reconcile` returned `Compatible`.
pub fn missing_suffix<'a>(
    source_history: &'a [RevisionId],
    target_tip: &RevisionId,
) -> &'a [RevisionId] {
    if target_tip.is_null() {
        return source_history;
    }
    match source_history.iter().position(|id| id == target_tip) {
        Some(idx) => &source_history[idx + 1..],
        None => source_history,
    }
}
