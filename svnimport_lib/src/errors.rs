// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

use failure::Fail;

#[derive(Debug, Fail)]
pub enum ErrorKind {
    /// A mutation was attempted on a read-only source branch view. Always
    /// signaled, never silently ignored: swallowing it would mask a caller
    /// bug.
    #[fail(display = "unsupported operation on a read-only branch: {}", _0)]
    UnsupportedOperation(&'static str),
    #[fail(display = "unknown branching scheme: {}", _0)]
    UnknownScheme(String),
    #[fail(display = "not a branch: {}", _0)]
    NotABranch(String),
}
