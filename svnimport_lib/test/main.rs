// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! End-to-end conversion scenarios against in-memory and file-backed
//! destinations.

#![deny(warnings)]
#![allow(non_local_definitions)] // old failure_derive macro trips a newer lint

use std::fs;

use slog::{o, Discard, Logger};
use tempdir::TempDir;

use dagrepo::{DagStore, FileDagStore, MemDagStore};
use svn_types::{BranchPath, BranchPathBuf, RevisionId};
use svnrepo::{load_dumpfile, MemSvnRepo, NodeOp, SvnSource};

use svnimport_lib::{
    BranchingScheme, ConvertRepository, ConvertSummary, MemRepositoryConfig, NullProgress,
    RepositoryConfig,
};

fn path(s: &str) -> BranchPathBuf {
    BranchPathBuf::from_string(s.to_string()).unwrap()
}

fn id(s: &str) -> RevisionId {
    RevisionId::from_string(s.to_string())
}

fn logger() -> Logger {
    Logger::root(Discard, o!())
}

fn params<'a>(
    source: &'a MemSvnRepo,
    dest: &'a dyn DagStore,
    config: &'a dyn RepositoryConfig,
) -> ConvertRepository<'a> {
    ConvertRepository {
        source,
        dest,
        config,
        logger: logger(),
        progress: Box::new(NullProgress),
        scheme: None,
        create_shared_repo: false,
        working_copies: false,
        import_all: false,
        branch_filter: None,
    }
}

fn convert(source: &MemSvnRepo, dest: &dyn DagStore) -> ConvertSummary {
    let config = MemRepositoryConfig::new();
    params(source, dest, &config).run().unwrap()
}

#[test]
fn test_single_trunk_commit() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![
        (path("trunk"), NodeOp::AddDir),
        (path("trunk/foo"), NodeOp::AddFile),
    ])
    .unwrap();

    let dest = MemDagStore::new();
    let summary = convert(&repo, &dest);
    assert!(summary.is_success());
    assert_eq!(summary.converted, vec![path("trunk")]);

    assert_eq!(dest.branch_paths(), vec!["trunk".to_string()]);
    assert_eq!(
        dest.branch_history(&path("trunk")).unwrap(),
        vec![id("svn-v1-trunk0:trunk:1")]
    );
    assert_eq!(
        dest.branch_parent(&path("trunk")),
        Some("svn+mem://uuid/trunk".to_string())
    );
}

#[test]
fn test_rerun_on_unchanged_source_is_stable() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();

    let dest = MemDagStore::new();
    let first = convert(&repo, &dest);
    let history = dest.branch_history(&path("trunk")).unwrap();
    let second = convert(&repo, &dest);
    assert!(first.is_success() && second.is_success());
    assert_eq!(dest.branch_history(&path("trunk")).unwrap(), history);
}

#[test]
fn test_later_commits_fast_forward_the_target() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![
        (path("trunk"), NodeOp::AddDir),
        (path("trunk/foo"), NodeOp::AddFile),
    ])
    .unwrap();

    let dest = MemDagStore::new();
    convert(&repo, &dest);
    assert_eq!(dest.branch_history(&path("trunk")).unwrap().len(), 1);

    repo.commit(vec![(path("trunk/foo"), NodeOp::Modify)]).unwrap();
    repo.commit(vec![(path("trunk/foo"), NodeOp::Modify)]).unwrap();
    let summary = convert(&repo, &dest);
    assert!(summary.is_success());
    assert_eq!(
        dest.branch_history(&path("trunk")).unwrap(),
        vec![
            id("svn-v1-trunk0:trunk:1"),
            id("svn-v1-trunk0:trunk:2"),
            id("svn-v1-trunk0:trunk:3"),
        ]
    );
}

#[test]
fn test_replaced_branch_resets_target_history() {
    let mut repo = MemSvnRepo::new("uuid");
    // trunk created in r1; untouched noise up to r3.
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![(path("noise"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![(path("noise/f"), NodeOp::AddFile)]).unwrap();

    let dest = MemDagStore::new();
    convert(&repo, &dest);
    assert_eq!(
        dest.branch_history(&path("trunk")).unwrap(),
        vec![id("svn-v1-trunk0:trunk:1")]
    );

    // trunk deleted and recreated as a fresh directory (no copy), then
    // more noise. The old r1 must not survive as an ancestor.
    repo.commit(vec![(path("trunk"), NodeOp::Delete)]).unwrap();
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![(path("noise/f"), NodeOp::Modify)]).unwrap();

    let summary = convert(&repo, &dest);
    assert!(summary.is_success());
    assert_eq!(
        dest.branch_history(&path("trunk")).unwrap(),
        vec![id("svn-v1-trunk0:trunk:5")]
    );
}

#[test]
fn test_copied_branch_shares_trunk_ancestry() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![
        (path("trunk"), NodeOp::AddDir),
        (path("trunk/foo"), NodeOp::AddFile),
    ])
    .unwrap();
    repo.commit(vec![
        (path("branches"), NodeOp::AddDir),
        (
            path("branches/feature"),
            NodeOp::Copy {
                from: path("trunk"),
                from_rev: 1,
            },
        ),
    ])
    .unwrap();

    let dest = MemDagStore::new();
    let summary = convert(&repo, &dest);
    assert!(summary.is_success());
    assert_eq!(
        dest.branch_history(&path("branches/feature")).unwrap(),
        vec![
            id("svn-v1-trunk0:trunk:1"),
            id("svn-v1-trunk0:branches/feature:2"),
        ]
    );
}

#[test]
fn test_import_all_requires_shared_repository() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();

    let dest = MemDagStore::new();
    let config = MemRepositoryConfig::new();
    let mut conversion = params(&repo, &dest, &config);
    conversion.import_all = true;
    assert!(conversion.run().is_err());
}

#[test]
fn test_shared_repository_batch_fetch_does_not_change_state() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![
        (path("branches"), NodeOp::AddDir),
        (
            path("branches/a"),
            NodeOp::Copy {
                from: path("trunk"),
                from_rev: 1,
            },
        ),
    ])
    .unwrap();

    let plain = MemDagStore::new();
    convert(&repo, &plain);

    let shared = MemDagStore::new();
    let config = MemRepositoryConfig::new();
    let mut conversion = params(&repo, &shared, &config);
    conversion.create_shared_repo = true;
    let summary = conversion.run().unwrap();
    assert!(summary.is_success());

    // The batch fetch saw every discovered tip...
    assert!(shared.has_shared_repository());
    let fetched = shared.fetched();
    assert!(fetched.contains(&id("svn-v1-trunk0:trunk:1")));
    assert!(fetched.contains(&id("svn-v1-trunk0:branches/a:2")));
    // ...and final branch state matches the branch-by-branch run.
    for branch in &["trunk", "branches/a"] {
        assert_eq!(
            shared.branch_history(&path(branch)),
            plain.branch_history(&path(branch)),
            "history mismatch for {}",
            branch
        );
    }

    let all = MemDagStore::new();
    let config = MemRepositoryConfig::new();
    let mut conversion = params(&repo, &all, &config);
    conversion.create_shared_repo = true;
    conversion.import_all = true;
    conversion.run().unwrap();
    assert!(all.fetched_all());
}

#[test]
fn test_working_copy_materialization() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();

    let dest = MemDagStore::new();
    let config = MemRepositoryConfig::new();
    let mut conversion = params(&repo, &dest, &config);
    conversion.working_copies = true;
    conversion.run().unwrap();
    assert!(dest.has_working_copy(&path("trunk")));

    let bare = MemDagStore::new();
    convert(&repo, &bare);
    assert!(!bare.has_working_copy(&path("trunk")));
}

#[test]
fn test_branch_filter_excludes_tags() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![
        (path("tags"), NodeOp::AddDir),
        (
            path("tags/1.0"),
            NodeOp::Copy {
                from: path("trunk"),
                from_rev: 1,
            },
        ),
    ])
    .unwrap();

    let dest = MemDagStore::new();
    let config = MemRepositoryConfig::new();
    let scheme = BranchingScheme::default();
    let mut conversion = params(&repo, &dest, &config);
    conversion.branch_filter = Some(Box::new(move |candidate| {
        candidate.exists && !scheme.is_tag(&candidate.path)
    }));
    let summary = conversion.run().unwrap();
    assert!(summary.is_success());
    assert_eq!(dest.branch_paths(), vec!["trunk".to_string()]);
}

#[test]
fn test_deleted_candidate_is_skipped_not_failed() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![(path("trunk"), NodeOp::Delete)]).unwrap();

    let dest = MemDagStore::new();
    let config = MemRepositoryConfig::new();
    let mut conversion = params(&repo, &dest, &config);
    // Let deleted candidates through to the per-branch re-validation.
    conversion.branch_filter = Some(Box::new(|_| true));
    let summary = conversion.run().unwrap();

    assert!(summary.is_success());
    assert!(summary.converted.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, path("trunk"));
    assert!(dest.branch_paths().is_empty());
}

#[test]
fn test_scheme_override_is_persisted() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![
        (path("stable"), NodeOp::AddDir),
        (path("trunk"), NodeOp::AddDir),
    ])
    .unwrap();

    let config = MemRepositoryConfig::new();
    let first = MemDagStore::new();
    let mut conversion = params(&repo, &first, &config);
    conversion.scheme = Some(BranchingScheme::List(vec!["stable".to_string()]));
    conversion.run().unwrap();
    assert_eq!(first.branch_paths(), vec!["stable".to_string()]);

    // A later run without an override picks the stored scheme up.
    let second = MemDagStore::new();
    params(&repo, &second, &config).run().unwrap();
    assert_eq!(second.branch_paths(), vec!["stable".to_string()]);
    assert!(config.get_locations().unwrap().contains("svn+mem://uuid"));
}

#[test]
fn test_per_branch_failure_does_not_abort_siblings() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![
        (path("branches"), NodeOp::AddDir),
        (
            path("branches/a"),
            NodeOp::Copy {
                from: path("trunk"),
                from_rev: 1,
            },
        ),
    ])
    .unwrap();

    let dir = TempDir::new("svnimport_test").unwrap();
    let dest = FileDagStore::open(dir.path()).unwrap();
    let config = MemRepositoryConfig::new();
    params(&repo, &dest, &config).run().unwrap();

    // Corrupt one branch's destination state, grow the source, re-run.
    fs::write(dir.path().join("trunk/.dag/branch.toml"), "history = 3\n").unwrap();
    repo.commit(vec![(path("trunk/f"), NodeOp::AddFile)]).unwrap();
    repo.commit(vec![(path("branches/a/f"), NodeOp::AddFile)]).unwrap();

    let summary = params(&repo, &dest, &config).run().unwrap();
    assert!(!summary.is_success());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, path("trunk"));
    assert_eq!(summary.converted, vec![path("branches/a")]);

    // The healthy sibling still advanced.
    let container = dest.open_or_create_container(&path("branches/a")).unwrap();
    let branch = container.open_branch().unwrap().unwrap();
    assert_eq!(branch.revision_history().unwrap().len(), 3);
}

#[test]
fn test_file_destination_survives_restart() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("trunk"), NodeOp::AddDir)]).unwrap();

    let dir = TempDir::new("svnimport_test").unwrap();
    {
        let dest = FileDagStore::open(dir.path()).unwrap();
        convert(&repo, &dest);
    }
    repo.commit(vec![(path("trunk/f"), NodeOp::AddFile)]).unwrap();
    {
        let dest = FileDagStore::open(dir.path()).unwrap();
        let summary = convert(&repo, &dest);
        assert!(summary.is_success());
        let container = dest.open_or_create_container(&path("trunk")).unwrap();
        let branch = container.open_branch().unwrap().unwrap();
        assert_eq!(
            branch.revision_history().unwrap(),
            vec![id("svn-v1-trunk0:trunk:1"), id("svn-v1-trunk0:trunk:2")]
        );
    }
}

#[test]
fn test_dumpfile_to_destination() {
    let dump = concat!(
        "SVN-fs-dump-format-version: 2\n",
        "\n",
        "UUID: 6d1b8b6c-0000-0000-0000-000000000000\n",
        "\n",
        "Revision-number: 1\n",
        "Prop-content-length: 10\n",
        "Content-length: 10\n",
        "\n",
        "PROPS-END\n",
        "\n",
        "Node-path: trunk\n",
        "Node-kind: dir\n",
        "Node-action: add\n",
        "\n",
        "Revision-number: 2\n",
        "Prop-content-length: 10\n",
        "Content-length: 10\n",
        "\n",
        "PROPS-END\n",
        "\n",
        "Node-path: branches\n",
        "Node-kind: dir\n",
        "Node-action: add\n",
        "\n",
        "Node-path: branches/b\n",
        "Node-kind: dir\n",
        "Node-action: add\n",
        "Node-copyfrom-rev: 1\n",
        "Node-copyfrom-path: trunk\n",
        "\n",
    );
    let repo = load_dumpfile(dump.as_bytes()).unwrap();
    assert_eq!(repo.uuid(), "6d1b8b6c-0000-0000-0000-000000000000");

    let dest = MemDagStore::new();
    let summary = convert(&repo, &dest);
    assert!(summary.is_success());
    assert_eq!(
        dest.branch_paths(),
        vec!["branches/b".to_string(), "trunk".to_string()]
    );
    assert_eq!(
        dest.branch_history(&path("branches/b")).unwrap(),
        vec![
            id("svn-v1-trunk0:trunk:1"),
            id("svn-v1-trunk0:branches/b:2"),
        ]
    );
}

#[test]
fn test_root_scheme_converts_whole_repository() {
    let mut repo = MemSvnRepo::new("uuid");
    repo.commit(vec![(path("dir"), NodeOp::AddDir)]).unwrap();
    repo.commit(vec![(path("dir/f"), NodeOp::AddFile)]).unwrap();

    let dest = MemDagStore::new();
    let config = MemRepositoryConfig::new();
    let mut conversion = params(&repo, &dest, &config);
    conversion.scheme = Some(BranchingScheme::Root);
    let summary = conversion.run().unwrap();
    assert!(summary.is_success());
    assert_eq!(
        dest.branch_history(BranchPath::root()).unwrap(),
        vec![id("svn-v1-none::1"), id("svn-v1-none::2")]
    );
}
