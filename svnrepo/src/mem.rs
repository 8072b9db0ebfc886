// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! An in-memory source repository.
//!
//! Keeps a full tree snapshot per revision, so path lookups and history
//! walks are exact. Built programmatically through `commit` or from a
//! dumpfile via `crate::dump::load_dumpfile`; intended for tests and local
//! imports, in the spirit of an in-memory collaborator implementation.

use std::collections::BTreeMap;

use failure::{bail, ensure, Fallible};

use svn_types::{BranchPath, BranchPathBuf, NodeKind, RevNum};

use crate::errors::ErrorKind;
use crate::{ChangeAction, HistoryIter, LogEntry, PathChange, SvnSource, TreeSnapshot};

/// One node operation inside a commit.
#[derive(Clone, Debug)]
pub enum NodeOp {
    AddDir,
    AddFile,
    /// Touch an existing node without changing the tree shape.
    Modify,
    /// Copy the node (and its subtree) from `from` as of `from_rev`.
    Copy {
        from: BranchPathBuf,
        from_rev: RevNum,
    },
    /// Delete the node and its subtree.
    Delete,
}

#[derive(Clone, Debug)]
struct NodeInfo {
    kind: NodeKind,
    /// Revision this incarnation of the node appeared in.
    created: RevNum,
}

#[derive(Clone, Debug, Default)]
struct RevisionRecord {
    changed: BTreeMap<BranchPathBuf, PathChange>,
    tree: BTreeMap<BranchPathBuf, NodeInfo>,
}

pub struct MemSvnRepo {
    uuid: String,
    url: String,
    revs: Vec<RevisionRecord>,
}

impl MemSvnRepo {
    pub fn new<S: Into<String>>(uuid: S) -> MemSvnRepo {
        let uuid = uuid.into();
        let url = format!("svn+mem://{}", uuid);
        MemSvnRepo {
            uuid,
            url,
            // Revision zero: the empty root tree.
            revs: vec![RevisionRecord::default()],
        }
    }

    pub(crate) fn set_uuid(&mut self, uuid: String) {
        self.url = format!("svn+mem://{}", uuid);
        self.uuid = uuid;
    }

    /// Apply one commit and return its revision number. Operations are
    /// applied in order; parents must exist before children are added.
    pub fn commit(&mut self, ops: Vec<(BranchPathBuf, NodeOp)>) -> Fallible<RevNum> {
        let revnum = self.revs.len() as RevNum;
        let last = self.revs.last().expect("revision zero always present");
        let mut tree = last.tree.clone();
        let mut changed: BTreeMap<BranchPathBuf, PathChange> = BTreeMap::new();

        for (path, op) in ops {
            ensure!(
                !path.is_root(),
                "cannot apply a node operation to the repository root"
            );
            let change = match op {
                NodeOp::AddDir => add_node(&mut tree, &path, NodeKind::Directory, revnum)?,
                NodeOp::AddFile => add_node(&mut tree, &path, NodeKind::File, revnum)?,
                NodeOp::Modify => {
                    ensure!(tree.contains_key(&path), "cannot modify `{}`: not present", path);
                    PathChange::new(ChangeAction::Modify)
                }
                NodeOp::Copy { from, from_rev } => {
                    self.copy_node(&mut tree, &path, &from, from_rev, revnum)?
                }
                NodeOp::Delete => {
                    ensure!(tree.contains_key(&path), "cannot delete `{}`: not present", path);
                    remove_subtree(&mut tree, &path);
                    PathChange::new(ChangeAction::Delete)
                }
            };
            record_change(&mut changed, path, change);
        }

        self.revs.push(RevisionRecord { changed, tree });
        Ok(revnum)
    }

    fn record(&self, revnum: RevNum) -> Fallible<&RevisionRecord> {
        self.revs
            .get(revnum as usize)
            .ok_or_else(|| ErrorKind::NoSuchRevision(revnum).into())
    }

    fn copy_node(
        &self,
        tree: &mut BTreeMap<BranchPathBuf, NodeInfo>,
        path: &BranchPath,
        from: &BranchPath,
        from_rev: RevNum,
        revnum: RevNum,
    ) -> Fallible<PathChange> {
        let source = self.record(from_rev)?;
        let kind = if from.is_root() {
            NodeKind::Directory
        } else {
            match source.tree.get(from) {
                Some(info) => info.kind,
                None => return Err(ErrorKind::NoSuchPath(from.to_string(), from_rev).into()),
            }
        };
        ensure_parent_is_dir(tree, path)?;
        let action = if tree.contains_key(path) {
            remove_subtree(tree, path);
            ChangeAction::Replace
        } else {
            ChangeAction::Add
        };
        tree.insert(
            path.to_owned(),
            NodeInfo {
                kind,
                created: revnum,
            },
        );
        for (source_path, info) in &source.tree {
            if source_path.as_str() != from.as_str() && source_path.starts_with(from) {
                let rel = source_path
                    .strip_prefix(from)
                    .expect("subtree path has its root as prefix");
                tree.insert(
                    path.join(rel),
                    NodeInfo {
                        kind: info.kind,
                        created: revnum,
                    },
                );
            }
        }
        Ok(PathChange::copied(action, from.to_owned(), from_rev))
    }
}

fn add_node(
    tree: &mut BTreeMap<BranchPathBuf, NodeInfo>,
    path: &BranchPath,
    kind: NodeKind,
    revnum: RevNum,
) -> Fallible<PathChange> {
    ensure_parent_is_dir(tree, path)?;
    let action = if tree.contains_key(path) {
        remove_subtree(tree, path);
        ChangeAction::Replace
    } else {
        ChangeAction::Add
    };
    tree.insert(
        path.to_owned(),
        NodeInfo {
            kind,
            created: revnum,
        },
    );
    Ok(PathChange::new(action))
}

fn ensure_parent_is_dir(tree: &BTreeMap<BranchPathBuf, NodeInfo>, path: &BranchPath) -> Fallible<()> {
    let parent = path.parent().expect("non-root path has a parent");
    if parent.is_root() {
        return Ok(());
    }
    match tree.get(parent) {
        Some(info) if info.kind == NodeKind::Directory => Ok(()),
        Some(_) => bail!("parent of `{}` is not a directory", path),
        None => bail!("parent of `{}` does not exist", path),
    }
}

fn remove_subtree(tree: &mut BTreeMap<BranchPathBuf, NodeInfo>, path: &BranchPath) {
    let doomed: Vec<BranchPathBuf> = tree
        .keys()
        .filter(|p| p.starts_with(path))
        .cloned()
        .collect();
    for p in doomed {
        tree.remove(&p);
    }
}

fn record_change(
    changed: &mut BTreeMap<BranchPathBuf, PathChange>,
    path: BranchPathBuf,
    change: PathChange,
) {
    // A delete followed by an add of the same path within one commit is a
    // replace on the wire.
    if change.action == ChangeAction::Add {
        if let Some(prior) = changed.get(&path) {
            if prior.action == ChangeAction::Delete {
                changed.insert(
                    path,
                    PathChange {
                        action: ChangeAction::Replace,
                        copyfrom: change.copyfrom,
                    },
                );
                return;
            }
        }
    }
    changed.insert(path, change);
}

/// Where the walked path came from in a given revision.
enum Origin {
    /// Freshly added here; the walk ends.
    Created,
    /// Copied from another path; the walk continues there.
    Copied(BranchPathBuf, RevNum),
    /// Modified only; the walk continues one revision back.
    Inherited,
}

fn incarnation(record: &RevisionRecord, path: &BranchPath) -> Origin {
    let mut ancestor = Some(path);
    while let Some(candidate) = ancestor {
        if candidate.is_root() {
            break;
        }
        if let Some(change) = record.changed.get(candidate) {
            match change.action {
                ChangeAction::Add | ChangeAction::Replace => {
                    return match &change.copyfrom {
                        Some((from, from_rev)) => {
                            let rel = path
                                .strip_prefix(candidate)
                                .expect("ancestor is a prefix of the walked path");
                            Origin::Copied(from.join(rel), *from_rev)
                        }
                        None => Origin::Created,
                    };
                }
                ChangeAction::Modify | ChangeAction::Delete => {}
            }
        }
        ancestor = candidate.parent();
    }
    Origin::Inherited
}

fn branch_affected(record: &RevisionRecord, path: &BranchPath) -> bool {
    record
        .changed
        .keys()
        .any(|changed| changed.starts_with(path) || path.starts_with(changed))
}

struct MemHistoryIter<'a> {
    repo: &'a MemSvnRepo,
    path: BranchPathBuf,
    revnum: RevNum,
    done: bool,
}

impl<'a> Iterator for MemHistoryIter<'a> {
    type Item = Fallible<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while self.revnum >= 1 {
            let record = &self.repo.revs[self.revnum as usize];
            if !branch_affected(record, &self.path) {
                self.revnum -= 1;
                continue;
            }
            let entry = LogEntry {
                path: self.path.clone(),
                revnum: self.revnum,
                changed_paths: record.changed.clone(),
            };
            match incarnation(record, &self.path) {
                Origin::Created => self.done = true,
                Origin::Copied(from, from_rev) => {
                    self.path = from;
                    self.revnum = from_rev;
                }
                Origin::Inherited => self.revnum -= 1,
            }
            return Some(Ok(entry));
        }
        self.done = true;
        None
    }
}

impl SvnSource for MemSvnRepo {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn latest_revnum(&self) -> Fallible<RevNum> {
        Ok((self.revs.len() - 1) as RevNum)
    }

    fn check_path(&self, path: &BranchPath, revnum: RevNum) -> Fallible<Option<NodeKind>> {
        let record = self.record(revnum)?;
        if path.is_root() {
            return Ok(Some(NodeKind::Directory));
        }
        Ok(record.tree.get(path).map(|info| info.kind))
    }

    fn follow_history<'a>(
        &'a self,
        path: &BranchPath,
        revnum: RevNum,
    ) -> Fallible<HistoryIter<'a>> {
        if self.check_path(path, revnum)?.is_none() {
            // Nothing ever lived here as of `revnum`: genesis right away.
            return Ok(Box::new(std::iter::empty()));
        }
        Ok(Box::new(MemHistoryIter {
            repo: self,
            path: path.to_owned(),
            revnum,
            done: false,
        }))
    }

    fn root_identifier(&self, path: &BranchPath, revnum: RevNum) -> Fallible<String> {
        let record = self.record(revnum)?;
        let created = if path.is_root() {
            0
        } else {
            match record.tree.get(path) {
                Some(info) => info.created,
                None => return Err(ErrorKind::NoSuchPath(path.to_string(), revnum).into()),
            }
        };
        Ok(format!("{}:{}:{}", self.uuid, path, created))
    }

    fn snapshot(&self, path: &BranchPath, revnum: RevNum) -> Fallible<TreeSnapshot> {
        let record = self.record(revnum)?;
        if !path.is_root() && !record.tree.contains_key(path) {
            return Err(ErrorKind::NoSuchPath(path.to_string(), revnum).into());
        }
        let mut entries = BTreeMap::new();
        for (node, info) in &record.tree {
            if node.as_str() == path.as_str() || !node.starts_with(path) {
                continue;
            }
            let rel = node
                .strip_prefix(path)
                .expect("subtree path has its root as prefix");
            entries.insert(rel.to_owned(), info.kind);
        }
        Ok(TreeSnapshot { revnum, entries })
    }
}
