// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

use failure::Fail;

#[derive(Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "invalid branch path: {}", _0)]
    InvalidPath(String),
    #[fail(display = "invalid revision id: {}", _0)]
    InvalidRevisionId(String),
    #[fail(display = "invalid mapping scheme tag: {}", _0)]
    InvalidSchemeTag(String),
}
