// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Load a Subversion dumpfile into a `MemSvnRepo`.
//!
//! Only tree structure and copy metadata are retained; property and text
//! payloads are length-skipped. Versions 1 through 3 of the dump format
//! share the record layout consumed here.

use std::io::{self, BufRead, Read};

use failure::Fallible;

use svn_types::{BranchPathBuf, RevNum};

use crate::errors::ErrorKind;
use crate::mem::{MemSvnRepo, NodeOp};

const DEFAULT_UUID: &str = "00000000-0000-0000-0000-000000000000";

pub fn load_dumpfile<R: BufRead>(mut reader: R) -> Fallible<MemSvnRepo> {
    let preamble = match read_block(&mut reader)? {
        Some(headers) => headers,
        None => return Err(ErrorKind::NotADumpFile("empty stream".to_string()).into()),
    };
    let version = preamble
        .get("SVN-fs-dump-format-version")
        .ok_or_else(|| ErrorKind::NotADumpFile("missing format header".to_string()))?;
    match version.parse::<u32>() {
        Ok(1..=3) => {}
        _ => {
            return Err(
                ErrorKind::NotADumpFile(format!("unsupported format version {}", version)).into(),
            );
        }
    }

    let mut repo = MemSvnRepo::new(DEFAULT_UUID);
    let mut committed_any = false;
    let mut pending: Option<(RevNum, Vec<(BranchPathBuf, NodeOp)>)> = None;

    while let Some(headers) = read_block(&mut reader)? {
        if let Some(uuid) = headers.get("UUID") {
            // Only the UUID seen before the first revision identifies the
            // repository; anything later is ignored.
            if !committed_any && pending.is_none() {
                repo.set_uuid(uuid.to_string());
            }
        } else if let Some(revnum) = headers.get("Revision-number") {
            committed_any |= flush(&mut repo, pending.take())?;
            pending = Some((parse_number(revnum)?, Vec::new()));
            skip_content(&mut reader, &headers)?;
        } else if let Some(path) = headers.get("Node-path") {
            let node = parse_node(path, &headers)?;
            match pending.as_mut() {
                Some((_, ops)) => ops.push(node),
                None => {
                    return Err(ErrorKind::MalformedDump(
                        "node record outside a revision".to_string(),
                    )
                    .into());
                }
            }
            skip_content(&mut reader, &headers)?;
        } else {
            return Err(ErrorKind::MalformedDump(format!(
                "unrecognized record starting with `{}`",
                headers.first()
            ))
            .into());
        }
    }
    flush(&mut repo, pending.take())?;
    Ok(repo)
}

fn flush(
    repo: &mut MemSvnRepo,
    pending: Option<(RevNum, Vec<(BranchPathBuf, NodeOp)>)>,
) -> Fallible<bool> {
    match pending {
        None => Ok(false),
        // Revision zero carries only properties; the store starts there.
        Some((0, _)) => Ok(false),
        Some((revnum, ops)) => {
            let committed = repo.commit(ops)?;
            if committed != revnum {
                return Err(ErrorKind::MalformedDump(format!(
                    "expected revision {}, dump declares {}",
                    committed, revnum
                ))
                .into());
            }
            Ok(true)
        }
    }
}

fn parse_node(path: &str, headers: &Headers) -> Fallible<(BranchPathBuf, NodeOp)> {
    let path = BranchPathBuf::from_string(path.to_string())?;
    let action = headers
        .get("Node-action")
        .ok_or_else(|| ErrorKind::MalformedDump(format!("`{}` has no node action", path)))?;
    let copyfrom = match (
        headers.get("Node-copyfrom-path"),
        headers.get("Node-copyfrom-rev"),
    ) {
        (Some(from), Some(from_rev)) => Some((
            BranchPathBuf::from_string(from.to_string())?,
            parse_number(from_rev)?,
        )),
        (None, None) => None,
        _ => {
            return Err(
                ErrorKind::MalformedDump(format!("`{}` has incomplete copyfrom", path)).into(),
            );
        }
    };
    let op = match action {
        "add" | "replace" => match copyfrom {
            Some((from, from_rev)) => NodeOp::Copy { from, from_rev },
            None => match headers.get("Node-kind") {
                Some("dir") => NodeOp::AddDir,
                Some("file") => NodeOp::AddFile,
                _ => {
                    return Err(
                        ErrorKind::MalformedDump(format!("`{}` has no node kind", path)).into(),
                    );
                }
            },
        },
        "change" => NodeOp::Modify,
        "delete" => NodeOp::Delete,
        other => {
            return Err(
                ErrorKind::MalformedDump(format!("unknown node action `{}`", other)).into(),
            );
        }
    };
    Ok((path, op))
}

fn parse_number(value: &str) -> Fallible<RevNum> {
    value
        .parse::<RevNum>()
        .map_err(|_| ErrorKind::MalformedDump(format!("bad revision number `{}`", value)).into())
}

/// Skip the payload following a record's header block. `Content-length`
/// wins when present; older dumps only carry the per-section lengths.
fn skip_content<R: BufRead>(reader: &mut R, headers: &Headers) -> Fallible<()> {
    let length = match headers.get("Content-length") {
        Some(value) => parse_length(value)?,
        None => {
            let props = match headers.get("Prop-content-length") {
                Some(value) => parse_length(value)?,
                None => 0,
            };
            let text = match headers.get("Text-content-length") {
                Some(value) => parse_length(value)?,
                None => 0,
            };
            props + text
        }
    };
    if length == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut reader.by_ref().take(length), &mut io::sink())?;
    if skipped != length {
        return Err(ErrorKind::MalformedDump(format!(
            "truncated payload: expected {} bytes, got {}",
            length, skipped
        ))
        .into());
    }
    Ok(())
}

fn parse_length(value: &str) -> Fallible<u64> {
    value
        .parse::<u64>()
        .map_err(|_| ErrorKind::MalformedDump(format!("bad content length `{}`", value)).into())
}

struct Headers(Vec<(String, String)>);

impl Headers {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn first(&self) -> &str {
        match self.0.first() {
            Some((k, _)) => k,
            None => "",
        }
    }
}

/// Read the next `Key: value` header block, skipping blank separator
/// lines. `None` at end of stream.
fn read_block<R: BufRead>(reader: &mut R) -> Fallible<Option<Headers>> {
    let mut line = String::new();
    let mut headers = Vec::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(if headers.is_empty() {
                None
            } else {
                Some(Headers(headers))
            });
        }
        let trimmed = line.trim_end_matches(|c| c == '\n' || c == '\r');
        if trimmed.is_empty() {
            if headers.is_empty() {
                continue;
            }
            return Ok(Some(Headers(headers)));
        }
        match trimmed.find(": ") {
            Some(idx) => headers.push((
                trimmed[..idx].to_string(),
                trimmed[idx + 2..].to_string(),
            )),
            None => {
                return Err(
                    ErrorKind::MalformedDump(format!("bad header line `{}`", trimmed)).into(),
                );
            }
        }
    }
}
