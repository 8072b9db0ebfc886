// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Leaf types shared by the Subversion conversion crates: normalized branch
//! paths, mapped revision identifiers and the scheme tags that version the
//! identifier mapping.

#![deny(warnings)]
#![allow(non_local_definitions)] // old failure_derive macro trips a newer lint

pub mod errors;
pub mod path;
pub mod revision_id;

pub use crate::errors::ErrorKind;
pub use crate::path::{BranchPath, BranchPathBuf};
pub use crate::revision_id::{
    generate_revision_id, parse_revision_id, RevNum, RevisionId, RevisionLocator, SchemeTag,
};

/// The kind of a node in the source repository tree. Absence is expressed as
/// `Option<NodeKind>` by the lookup APIs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    File,
    Directory,
}
