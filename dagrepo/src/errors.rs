// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

use failure::Fail;

#[derive(Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "branch already exists in container `{}`", _0)]
    BranchExists(String),
    #[fail(display = "pull into `{}` is not a fast-forward", _0)]
    NonFastForwardPull(String),
    #[fail(display = "corrupt branch state at `{}`: {}", _0, _1)]
    CorruptBranchState(String, String),
}
