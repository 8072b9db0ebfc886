// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! The mapping between source revisions and destination revision ids.
//!
//! A source revision is addressed by `(revision number, branch path)`; the
//! destination addresses revisions by opaque ids. `generate_revision_id`
//! derives `svn-v1-<scheme>:<escaped-path>:<revnum>` — deterministic,
//! collision-free for distinct inputs under one scheme, and invertible via
//! `parse_revision_id` for diagnostics and ancestry reconciliation.

use std::fmt;
use std::str::FromStr;

use failure::Fallible;

use crate::errors::ErrorKind;
use crate::path::{BranchPath, BranchPathBuf};

pub type RevNum = u64;

const REVISION_ID_PREFIX: &str = "svn-v1-";
const NULL_REVISION_STR: &str = "null:";

/// An opaque destination revision identifier.
///
/// Ids read back from the destination are not assumed to be parseable: a
/// target branch may predate this tool or use a different mapping. Such ids
/// simply never compare equal to a derived id.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RevisionId(String);

impl RevisionId {
    /// The null revision sentinel: the tip of an empty history.
    pub fn null() -> RevisionId {
        RevisionId(NULL_REVISION_STR.to_string())
    }

    pub fn is_null(&self) -> bool {
        self.0 == NULL_REVISION_STR
    }

    pub fn from_string(s: String) -> RevisionId {
        RevisionId(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

/// Versions the identifier mapping. Tags are embedded in every derived id,
/// so they may not contain the `:` field separator.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SchemeTag(String);

impl SchemeTag {
    pub fn new<S: Into<String>>(tag: S) -> Fallible<SchemeTag> {
        let tag = tag.into();
        if tag.is_empty() || tag.contains(':') || tag.contains(char::is_whitespace) {
            return Err(ErrorKind::InvalidSchemeTag(tag).into());
        }
        Ok(SchemeTag(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemeTag {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

/// The source-side address of a mapped revision. Two locators with equal
/// fields always map to the same id; distinct `(revnum, path)` pairs under
/// one scheme map to distinct ids.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RevisionLocator {
    pub revnum: RevNum,
    pub path: BranchPathBuf,
    pub scheme: SchemeTag,
}

impl RevisionLocator {
    pub fn revision_id(&self) -> RevisionId {
        RevisionId(format!(
            "{}{}:{}:{}",
            REVISION_ID_PREFIX,
            self.scheme,
            escape_svn_path(self.path.as_str()),
            self.revnum
        ))
    }
}

pub fn generate_revision_id(revnum: RevNum, path: &BranchPath, scheme: &SchemeTag) -> RevisionId {
    RevisionLocator {
        revnum,
        path: path.to_owned(),
        scheme: scheme.clone(),
    }
    .revision_id()
}

pub fn parse_revision_id(id: &RevisionId) -> Fallible<RevisionLocator> {
    let invalid = || ErrorKind::InvalidRevisionId(id.as_str().to_string());
    let body = id
        .as_str()
        .strip_prefix(REVISION_ID_PREFIX)
        .ok_or_else(invalid)?;
    let mut fields = body.split(':');
    let scheme = fields.next().ok_or_else(invalid)?;
    let path = fields.next().ok_or_else(invalid)?;
    let revnum = fields.next().ok_or_else(invalid)?;
    if fields.next().is_some() {
        return Err(invalid().into());
    }
    Ok(RevisionLocator {
        revnum: RevNum::from_str(revnum).map_err(|_| invalid())?,
        path: BranchPathBuf::from_string(unescape_svn_path(path)?)?,
        scheme: SchemeTag::new(scheme)?,
    })
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'/' || b == b'-' || b == b'_' || b == b'.'
}

/// Escape a branch path for embedding in a revision id. Everything outside
/// the unreserved set (notably `:` and `%`) becomes `%XX`.
pub fn escape_svn_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        if is_unreserved(b) {
            escaped.push(b as char);
        } else {
            escaped.push_str(&format!("%{:02X}", b));
        }
    }
    escaped
}

pub fn unescape_svn_path(escaped: &str) -> Fallible<String> {
    let invalid = || ErrorKind::InvalidRevisionId(format!("bad path escape in `{}`", escaped));
    let mut bytes = Vec::with_capacity(escaped.len());
    let mut rest = escaped.as_bytes();
    while let Some((&b, tail)) = rest.split_first() {
        if b == b'%' {
            if tail.len() < 2 {
                return Err(invalid().into());
            }
            let hex = std::str::from_utf8(&tail[..2]).map_err(|_| invalid())?;
            bytes.push(u8::from_str_radix(hex, 16).map_err(|_| invalid())?);
            rest = &tail[2..];
        } else {
            bytes.push(b);
            rest = tail;
        }
    }
    String::from_utf8(bytes).map_err(|_| invalid().into())
}
