// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Command line driver: load a Subversion dumpfile and convert its branches
//! into a file-backed destination store. Re-running against the same
//! destination is incremental.

#![deny(warnings)]
#![allow(non_local_definitions)] // old failure_derive macro trips a newer lint

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;

use clap::{App, Arg};
use failure::{bail, Fallible};
use slog::{error, info, o, Drain, Level, LevelFilter, Logger};

use dagrepo::FileDagStore;
use svnimport_lib::{BranchingScheme, ConvertRepository, FileRepositoryConfig, LogProgress};
use svnrepo::{load_dumpfile, SvnSource};

fn setup_app<'a, 'b>() -> App<'a, 'b> {
    App::new("svn to dag importer")
        .version("0.0.0")
        .about("Import a Subversion dumpfile into a DAG-model repository store.")
        .args_from_usage(
            r#"
            <INPUT>                  'input Subversion dumpfile'
            <OUTPUT>                 'destination store directory'
            --scheme [SCHEME]        'branching scheme override (none, trunkN, list-...)'
            --shared-repository      'create a shared repository and batch-fetch revisions'
            --working-copies         'materialize working copies for converted branches'
            --config [PATH]          'per-repository configuration file'
            --debug                  'print debug logs'
        "#,
        )
        .arg(
            Arg::from_usage(
                "--all 'import all revisions, not only those reachable from branches'",
            )
            .requires("shared-repository"),
        )
}

fn setup_logger(debug: bool) -> Logger {
    let level = if debug { Level::Debug } else { Level::Info };
    let decorator = slog_term::PlainSyncDecorator::new(io::stdout());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = LevelFilter::new(drain, level).fuse();
    Logger::root(drain, o![])
}

#[allow(deprecated)]
fn default_config_file() -> Fallible<PathBuf> {
    match std::env::home_dir() {
        Some(mut dir) => {
            dir.push(".svnimport.conf");
            Ok(dir)
        }
        None => bail!("cannot locate a home directory; pass --config"),
    }
}

fn main() -> Fallible<()> {
    let matches = setup_app().get_matches();
    let logger = setup_logger(matches.is_present("debug"));

    let input = matches.value_of("INPUT").expect("input is not specified");
    let output = matches.value_of("OUTPUT").expect("output is not specified");

    let source = load_dumpfile(BufReader::new(File::open(input)?))?;
    info!(
        logger,
        "loaded {} revisions from {} (uuid {})",
        source.latest_revnum()?,
        input,
        source.uuid()
    );

    let scheme = match matches.value_of("scheme") {
        Some(rendered) => Some(rendered.parse::<BranchingScheme>()?),
        None => None,
    };
    let config_file = match matches.value_of("config") {
        Some(path) => PathBuf::from(path),
        None => default_config_file()?,
    };
    let config = FileRepositoryConfig::open(config_file, source.uuid());
    let dest = FileDagStore::open(output)?;

    let summary = ConvertRepository {
        source: &source,
        dest: &dest,
        config: &config,
        logger: logger.clone(),
        progress: Box::new(LogProgress::new(logger.clone())),
        scheme,
        create_shared_repo: matches.is_present("shared-repository"),
        working_copies: matches.is_present("working-copies"),
        import_all: matches.is_present("all"),
        branch_filter: None,
    }
    .run()?;

    info!(
        logger,
        "{} branches converted, {} skipped, {} failed",
        summary.converted.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    for (path, reason) in &summary.skipped {
        info!(logger, "skipped {}: {}", path, reason);
    }
    for (path, err) in &summary.failed {
        error!(logger, "failed {}: {}", path, err);
    }
    if !summary.is_success() {
        process::exit(1);
    }
    Ok(())
}
