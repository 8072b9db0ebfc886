// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Branching schemes: the policy deciding which paths in the source
//! repository are branches or tags.
//!
//! A scheme is resolved once per conversion run and treated as immutable
//! for that run. Its string form round-trips through the configuration
//! store, and its tag versions every derived revision id.

use std::fmt;
use std::str::FromStr;

use failure::{Error, Fallible};

use svn_types::revision_id::{escape_svn_path, unescape_svn_path};
use svn_types::{BranchPath, BranchPathBuf, SchemeTag};

use crate::errors::ErrorKind;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BranchingScheme {
    /// The whole repository is a single branch rooted at the top.
    Root,
    /// The classic `trunk`/`branches/*`/`tags/*` layout, nested `level`
    /// directories below the repository root.
    Trunk { level: usize },
    /// An explicit list of branch path patterns; `*` matches one path
    /// component.
    List(Vec<String>),
}

impl Default for BranchingScheme {
    fn default() -> Self {
        BranchingScheme::Trunk { level: 0 }
    }
}

impl BranchingScheme {
    /// The scheme tag embedded in every revision id derived under this
    /// scheme.
    pub fn tag(&self) -> SchemeTag {
        SchemeTag::new(self.to_string()).expect("scheme strings never contain reserved characters")
    }

    pub fn is_branch(&self, path: &BranchPath) -> bool {
        let comps: Vec<&str> = path.components().collect();
        match self {
            BranchingScheme::Root => path.is_root(),
            BranchingScheme::Trunk { level } => {
                (comps.len() == level + 1 && comps[*level] == "trunk")
                    || (comps.len() == level + 2 && comps[*level] == "branches")
            }
            BranchingScheme::List(patterns) => {
                list_match(patterns, &comps) == Some(comps.len())
            }
        }
    }

    pub fn is_tag(&self, path: &BranchPath) -> bool {
        let comps: Vec<&str> = path.components().collect();
        match self {
            BranchingScheme::Trunk { level } => {
                comps.len() == level + 2 && comps[*level] == "tags"
            }
            BranchingScheme::Root | BranchingScheme::List(_) => false,
        }
    }

    /// The branch (or tag) root containing `path`, if any. This is how
    /// changed paths deep inside a branch are attributed to it.
    pub fn branch_path_of(&self, path: &BranchPath) -> Option<BranchPathBuf> {
        let comps: Vec<&str> = path.components().collect();
        let prefix_len = match self {
            BranchingScheme::Root => Some(0),
            BranchingScheme::Trunk { level } => {
                if comps.len() > *level && comps[*level] == "trunk" {
                    Some(level + 1)
                } else if comps.len() > level + 1
                    && (comps[*level] == "branches" || comps[*level] == "tags")
                {
                    Some(level + 2)
                } else {
                    None
                }
            }
            BranchingScheme::List(patterns) => list_match(patterns, &comps),
        };
        prefix_len.map(|len| join_components(&comps[..len]))
    }
}

fn list_match(patterns: &[String], comps: &[&str]) -> Option<usize> {
    for pattern in patterns {
        let pcomps: Vec<&str> = pattern.split('/').collect();
        if comps.len() >= pcomps.len()
            && pcomps
                .iter()
                .zip(comps.iter())
                .all(|(p, c)| *p == "*" || p == c)
        {
            return Some(pcomps.len());
        }
    }
    None
}

fn join_components(comps: &[&str]) -> BranchPathBuf {
    BranchPathBuf::from_string(comps.join("/"))
        .expect("components of a validated path rejoin cleanly")
}

impl fmt::Display for BranchingScheme {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BranchingScheme::Root => write!(fmt, "none"),
            BranchingScheme::Trunk { level } => write!(fmt, "trunk{}", level),
            BranchingScheme::List(patterns) => {
                let escaped: Vec<String> =
                    patterns.iter().map(|p| escape_svn_path(p)).collect();
                write!(fmt, "list-{}", escaped.join(","))
            }
        }
    }
}

impl FromStr for BranchingScheme {
    type Err = Error;

    fn from_str(s: &str) -> Fallible<Self> {
        if s == "none" || s == "root" {
            return Ok(BranchingScheme::Root);
        }
        if let Some(rest) = s.strip_prefix("trunk") {
            if rest.is_empty() {
                return Ok(BranchingScheme::Trunk { level: 0 });
            }
            if let Ok(level) = rest.parse::<usize>() {
                return Ok(BranchingScheme::Trunk { level });
            }
        }
        if let Some(rest) = s.strip_prefix("list-") {
            let mut patterns = Vec::new();
            for escaped in rest.split(',') {
                let pattern = unescape_svn_path(escaped)?;
                // Patterns obey path shape rules; `*` is an ordinary
                // component as far as validation is concerned.
                let validated = BranchPathBuf::from_string(pattern)?;
                if validated.is_root() {
                    return Err(ErrorKind::UnknownScheme(s.to_string()).into());
                }
                patterns.push(validated.into_string());
            }
            if !patterns.is_empty() {
                return Ok(BranchingScheme::List(patterns));
            }
        }
        Err(ErrorKind::UnknownScheme(s.to_string()).into())
    }
}
