// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! The conversion orchestrator.
//!
//! One pass drives every discovered branch through the same sequence:
//! ensure a destination container, ensure a destination branch (recording
//! the source URL as provenance on creation), reconcile ancestry against
//! the source, reset on divergence, fast-forward pull, and optionally
//! materialize a working copy. Branches are processed sequentially in
//! discovery order; a failure in one branch is reported and does not abort
//! its siblings, while failures in once-per-run steps abort the run.

use failure::{ensure, Error, Fallible};
use slog::{debug, error, info, warn, Logger};

use dagrepo::DagStore;
use svn_types::{generate_revision_id, BranchPathBuf, NodeKind, RevisionId};
use svnrepo::SvnSource;

use crate::branch::SvnBranch;
use crate::config::RepositoryConfig;
use crate::discovery::{find_branchpaths, BranchCandidate};
use crate::errors::ErrorKind;
use crate::progress::{ProgressGuard, ProgressReporter};
use crate::reconcile::{missing_suffix, reconcile, Reconciliation};
use crate::scheme::BranchingScheme;

pub struct ConvertRepository<'a> {
    pub source: &'a dyn SvnSource,
    pub dest: &'a dyn DagStore,
    pub config: &'a dyn RepositoryConfig,
    pub logger: Logger,
    pub progress: Box<dyn ProgressReporter>,
    /// Scheme override; persisted to the config store when given. Without
    /// it, the stored scheme (or the default) is used.
    pub scheme: Option<BranchingScheme>,
    pub create_shared_repo: bool,
    pub working_copies: bool,
    /// Import every revision, not only those reachable from branch tips.
    /// Requires a shared repository.
    pub import_all: bool,
    /// Candidate predicate; defaults to live branches only. Tag-only or
    /// branch-only conversion is expressed here, not in discovery.
    pub branch_filter: Option<Box<dyn Fn(&BranchCandidate) -> bool + 'a>>,
}

#[derive(Default)]
pub struct ConvertSummary {
    pub converted: Vec<BranchPathBuf>,
    pub skipped: Vec<(BranchPathBuf, String)>,
    pub failed: Vec<(BranchPathBuf, Error)>,
}

impl ConvertSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<'a> ConvertRepository<'a> {
    pub fn run(self) -> Fallible<ConvertSummary> {
        let Self {
            source,
            dest,
            config,
            logger,
            progress,
            scheme,
            create_shared_repo,
            working_copies,
            import_all,
            branch_filter,
        } = self;

        ensure!(
            !import_all || create_shared_repo,
            "importing all revisions requires a shared repository"
        );

        let scheme = match scheme {
            Some(scheme) => {
                config.set_branching_scheme(&scheme)?;
                scheme
            }
            None => config.get_branching_scheme()?.unwrap_or_default(),
        };
        config.add_location(source.url())?;

        // Pin the revision we convert up to; commits landing after this
        // point are picked up by the next pass.
        let as_of = source.latest_revnum()?;
        info!(
            logger,
            "converting {} as of r{} with scheme {}",
            source.url(),
            as_of,
            scheme
        );

        let mut candidates = find_branchpaths(source, &scheme, as_of, &logger)?;
        match &branch_filter {
            Some(filter) => candidates.retain(|candidate| filter(candidate)),
            None => candidates.retain(|candidate| candidate.exists),
        }

        if create_shared_repo {
            let shared = dest.open_or_create_shared_repository()?;
            dest.set_make_working_copies(working_copies)?;
            if import_all {
                shared.fetch_all()?;
            } else {
                // Batch-fetch everything reachable from the discovered tips
                // ahead of the per-branch loop. Purely an optimization; the
                // per-branch pulls decide final state.
                let tag = scheme.tag();
                let tips: Vec<RevisionId> = candidates
                    .iter()
                    .map(|candidate| {
                        generate_revision_id(candidate.revnum, &candidate.path, &tag)
                    })
                    .collect();
                shared.fetch(&tips)?;
            }
        }

        let total = candidates.len();
        let mut progress = ProgressGuard::new(progress);
        let mut summary = ConvertSummary::default();
        for (index, candidate) in candidates.into_iter().enumerate() {
            match convert_branch(source, dest, &scheme, &logger, &candidate, working_copies) {
                Ok(()) => {
                    debug!(logger, "converted {}", candidate.path);
                    summary.converted.push(candidate.path.clone());
                }
                Err(err) => {
                    // A candidate that stopped being a branch is recovered
                    // locally by skipping it.
                    let not_a_branch = match err.downcast_ref::<ErrorKind>() {
                        Some(ErrorKind::NotABranch(_)) => true,
                        _ => false,
                    };
                    if not_a_branch {
                        info!(logger, "skipping {}: {}", candidate.path, err);
                        summary.skipped.push((candidate.path.clone(), err.to_string()));
                    } else {
                        error!(logger, "failed to convert {}: {}", candidate.path, err);
                        let err = Error::from(err.context(format!("branch {}", candidate.path)));
                        summary.failed.push((candidate.path.clone(), err));
                    }
                }
            }
            progress.update(
                &format!("{}:{}", candidate.path, candidate.revnum),
                index + 1,
                total,
            );
        }
        Ok(summary)
    }
}

fn convert_branch(
    source: &dyn SvnSource,
    dest: &dyn DagStore,
    scheme: &BranchingScheme,
    logger: &Logger,
    candidate: &BranchCandidate,
    working_copies: bool,
) -> Fallible<()> {
    // Discovery ran against an earlier snapshot; re-validate before
    // touching the destination.
    match source.check_path(&candidate.path, candidate.revnum)? {
        Some(NodeKind::Directory) => {}
        _ => return Err(ErrorKind::NotABranch(candidate.path.to_string()).into()),
    }

    let source_branch = SvnBranch::open(source, candidate.path.clone(), candidate.revnum, scheme)?;
    let container = dest.open_or_create_container(&candidate.path)?;
    let mut target = match container.open_branch()? {
        Some(branch) => branch,
        None => {
            let mut branch = container.create_branch()?;
            branch.set_parent(&source_branch.url())?;
            branch
        }
    };

    let source_tip = source_branch.last_revision();
    let target_tip = target.last_revision()?;
    if source_tip != target_tip {
        match reconcile(source_branch.revision_history(), &target_tip) {
            Reconciliation::Diverged => {
                // The branch path was reused for an unrelated line of
                // history; previously synced revisions are discarded.
                warn!(
                    logger,
                    "target of {} holds unrelated history (tip {}); rebuilding from scratch",
                    candidate.path,
                    target_tip
                );
                target.set_revision_history(Vec::new())?;
            }
            Reconciliation::Compatible => {
                let missing = missing_suffix(source_branch.revision_history(), &target_tip);
                debug!(
                    logger,
                    "{}: pulling {} new revisions",
                    candidate.path,
                    missing.len()
                );
            }
        }
        target.pull(source_branch.revision_history())?;
    }

    if working_copies && !container.has_working_copy()? {
        container.create_working_copy()?;
    }
    Ok(())
}
