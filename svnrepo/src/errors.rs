// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

use failure::Fail;

use svn_types::RevNum;

#[derive(Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "no such revision: {}", _0)]
    NoSuchRevision(RevNum),
    #[fail(display = "path does not exist: {}@{}", _0, _1)]
    NoSuchPath(String, RevNum),
    #[fail(display = "{} is not a dump file", _0)]
    NotADumpFile(String),
    #[fail(display = "malformed dump stream: {}", _0)]
    MalformedDump(String),
}
