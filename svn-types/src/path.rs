// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Normalized, slash-separated relative paths inside a Subversion
//! repository. The empty path denotes the repository root. Paths are
//! compared structurally; trailing separators are insignificant and are
//! stripped on construction of the owned form.

use std::borrow::{Borrow, ToOwned};
use std::convert::AsRef;
use std::fmt;
use std::mem;
use std::ops::Deref;

use failure::Fallible;

use crate::errors::ErrorKind;

const SEPARATOR: char = '/';

#[derive(Clone, Debug, Default, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct BranchPathBuf(String);

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct BranchPath(str);

impl BranchPathBuf {
    /// The repository root.
    pub fn new() -> BranchPathBuf {
        Default::default()
    }

    /// Build a path from a string, stripping insignificant trailing
    /// separators and validating every component.
    pub fn from_string(s: String) -> Fallible<Self> {
        let trimmed = s.trim_end_matches(SEPARATOR);
        validate_path(trimmed)?;
        if trimmed.len() == s.len() {
            Ok(BranchPathBuf(s))
        } else {
            Ok(BranchPathBuf(trimmed.to_string()))
        }
    }

    pub fn push<P: AsRef<BranchPath>>(&mut self, path: P) {
        let path = path.as_ref();
        if path.is_root() {
            return;
        }
        if !self.0.is_empty() {
            self.0.push(SEPARATOR);
        }
        self.0.push_str(&path.0);
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for BranchPathBuf {
    type Target = BranchPath;
    fn deref(&self) -> &Self::Target {
        unsafe { mem::transmute(&*self.0) }
    }
}

impl AsRef<BranchPath> for BranchPathBuf {
    fn as_ref(&self) -> &BranchPath {
        self
    }
}

impl Borrow<BranchPath> for BranchPathBuf {
    fn borrow(&self) -> &BranchPath {
        self
    }
}

impl fmt::Display for BranchPathBuf {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&*self.0, formatter)
    }
}

impl BranchPath {
    /// The repository root as a borrowed path.
    pub fn root() -> &'static BranchPath {
        BranchPath::from_str_unchecked("")
    }

    pub fn from_str(s: &str) -> Fallible<&BranchPath> {
        validate_path(s)?;
        Ok(BranchPath::from_str_unchecked(s))
    }

    fn from_str_unchecked(s: &str) -> &BranchPath {
        unsafe { mem::transmute(s) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path components, in order. The root path has none.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|c| !c.is_empty())
    }

    /// The last path component, used as a branch nickname for display.
    pub fn last_component(&self) -> Option<&str> {
        self.components().last()
    }

    /// The parent directory, or `None` at the root.
    pub fn parent(&self) -> Option<&BranchPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(idx) => Some(BranchPath::from_str_unchecked(&self.0[..idx])),
            None => Some(BranchPath::root()),
        }
    }

    pub fn join(&self, other: &BranchPath) -> BranchPathBuf {
        let mut joined = self.to_owned();
        joined.push(other);
        joined
    }

    /// Whether `self` is `prefix` or lives below it, component-wise.
    pub fn starts_with(&self, prefix: &BranchPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        match self.0.strip_prefix(&prefix.0) {
            Some("") => true,
            Some(rest) => rest.starts_with(SEPARATOR),
            None => false,
        }
    }

    /// The remainder of `self` below `prefix`, if any. Stripping a path from
    /// itself yields the root.
    pub fn strip_prefix(&self, prefix: &BranchPath) -> Option<&BranchPath> {
        if prefix.is_root() {
            return Some(self);
        }
        match self.0.strip_prefix(&prefix.0) {
            Some("") => Some(BranchPath::root()),
            Some(rest) if rest.starts_with(SEPARATOR) => {
                Some(BranchPath::from_str_unchecked(&rest[1..]))
            }
            _ => None,
        }
    }
}

impl AsRef<BranchPath> for BranchPath {
    fn as_ref(&self) -> &BranchPath {
        self
    }
}

impl ToOwned for BranchPath {
    type Owned = BranchPathBuf;
    fn to_owned(&self) -> Self::Owned {
        BranchPathBuf(self.0.to_string())
    }
}

impl fmt::Display for BranchPath {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, formatter)
    }
}

fn validate_path(s: &str) -> Fallible<()> {
    if s.is_empty() {
        // The repository root.
        return Ok(());
    }
    if s.starts_with(SEPARATOR) || s.ends_with(SEPARATOR) {
        return Err(ErrorKind::InvalidPath(format!("not relative: `{}`", s)).into());
    }
    for component in s.split(SEPARATOR) {
        validate_component(s, component)?;
    }
    Ok(())
}

fn validate_component(path: &str, component: &str) -> Fallible<()> {
    if component.is_empty() {
        return Err(ErrorKind::InvalidPath(format!("empty component in `{}`", path)).into());
    }
    if component == "." || component == ".." {
        return Err(
            ErrorKind::InvalidPath(format!("component `{}` in `{}`", component, path)).into(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root() {
        let root = BranchPathBuf::new();
        assert!(root.is_root());
        assert_eq!(root.components().count(), 0);
        assert_eq!(root.last_component(), None);
        assert_eq!(format!("{}", root), "");
    }

    #[test]
    fn test_from_string_strips_trailing_separator() {
        let path = BranchPathBuf::from_string("branches/foo/".to_string()).unwrap();
        assert_eq!(path.as_str(), "branches/foo");
        let path = BranchPathBuf::from_string("trunk".to_string()).unwrap();
        assert_eq!(path.as_str(), "trunk");
    }

    #[test]
    fn test_invalid_paths() {
        assert!(BranchPathBuf::from_string("/trunk".to_string()).is_err());
        assert!(BranchPathBuf::from_string("a//b".to_string()).is_err());
        assert!(BranchPathBuf::from_string("a/./b".to_string()).is_err());
        assert!(BranchPathBuf::from_string("../a".to_string()).is_err());
        assert!(BranchPath::from_str("trunk/").is_err());
    }

    #[test]
    fn test_components() {
        let path = BranchPath::from_str("branches/foo").unwrap();
        assert_eq!(path.components().collect::<Vec<_>>(), vec!["branches", "foo"]);
        assert_eq!(path.last_component(), Some("foo"));
    }

    #[test]
    fn test_push_and_join() {
        let mut path = BranchPathBuf::new();
        path.push(BranchPath::from_str("branches").unwrap());
        path.push(BranchPath::from_str("foo").unwrap());
        assert_eq!(path.as_str(), "branches/foo");

        let joined = BranchPath::from_str("tags")
            .unwrap()
            .join(BranchPath::from_str("1.0").unwrap());
        assert_eq!(joined.as_str(), "tags/1.0");

        let rooted = BranchPath::root().join(BranchPath::from_str("trunk").unwrap());
        assert_eq!(rooted.as_str(), "trunk");
    }

    #[test]
    fn test_starts_with_is_component_wise() {
        let path = BranchPath::from_str("branches/foobar").unwrap();
        assert!(path.starts_with(BranchPath::from_str("branches").unwrap()));
        assert!(path.starts_with(BranchPath::root()));
        assert!(path.starts_with(path));
        assert!(!path.starts_with(BranchPath::from_str("branches/foo").unwrap()));
    }

    #[test]
    fn test_parent() {
        let path = BranchPath::from_str("branches/foo").unwrap();
        assert_eq!(path.parent().unwrap().as_str(), "branches");
        assert!(path.parent().unwrap().parent().unwrap().is_root());
        assert!(BranchPath::root().parent().is_none());
    }

    #[test]
    fn test_strip_prefix() {
        let path = BranchPath::from_str("branches/foo/bar").unwrap();
        let below = path
            .strip_prefix(BranchPath::from_str("branches/foo").unwrap())
            .unwrap();
        assert_eq!(below.as_str(), "bar");
        assert!(path.strip_prefix(path).unwrap().is_root());
        assert!(path
            .strip_prefix(BranchPath::from_str("branches/f").unwrap())
            .is_none());
    }
}
