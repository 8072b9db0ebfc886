// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Per-repository persistent settings, keyed by the source repository UUID.
//!
//! Stored are the default branching scheme and the locations the repository
//! has been seen at. The conversion core reads the scheme once per run and
//! treats it as immutable for that run; it never touches global filesystem
//! state directly — the store is injected.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use failure::Fallible;
use serde_derive::{Deserialize, Serialize};

use crate::scheme::BranchingScheme;

pub trait RepositoryConfig {
    fn get_branching_scheme(&self) -> Fallible<Option<BranchingScheme>>;

    fn set_branching_scheme(&self, scheme: &BranchingScheme) -> Fallible<()>;

    fn get_locations(&self) -> Fallible<BTreeSet<String>>;

    fn add_location(&self, location: &str) -> Fallible<()>;
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RepoSection {
    #[serde(
        default,
        rename = "branching-scheme",
        skip_serializing_if = "Option::is_none"
    )]
    branching_scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    locations: Vec<String>,
}

type ConfigFile = BTreeMap<String, RepoSection>;

/// Settings for one repository inside a shared TOML file holding one table
/// per repository UUID.
pub struct FileRepositoryConfig {
    file: PathBuf,
    uuid: String,
}

impl FileRepositoryConfig {
    pub fn open<P: Into<PathBuf>, S: Into<String>>(file: P, uuid: S) -> FileRepositoryConfig {
        FileRepositoryConfig {
            file: file.into(),
            uuid: uuid.into(),
        }
    }

    fn load(&self) -> Fallible<ConfigFile> {
        if !self.file.exists() {
            return Ok(ConfigFile::new());
        }
        let raw = fs::read_to_string(&self.file)?;
        Ok(toml::from_str(&raw)?)
    }

    fn save(&self, config: &ConfigFile) -> Fallible<()> {
        if let Some(dir) = self.file.parent() {
            fs::create_dir_all(dir)?;
        }
        let rendered = toml::to_string(config)?;
        let tmp = self.file.with_extension("tmp");
        fs::write(&tmp, rendered)?;
        fs::rename(&tmp, &self.file)?;
        Ok(())
    }

    fn update<F: FnOnce(&mut RepoSection)>(&self, f: F) -> Fallible<()> {
        let mut config = self.load()?;
        f(config.entry(self.uuid.clone()).or_insert_with(Default::default));
        self.save(&config)
    }
}

impl RepositoryConfig for FileRepositoryConfig {
    fn get_branching_scheme(&self) -> Fallible<Option<BranchingScheme>> {
        let config = self.load()?;
        match config.get(&self.uuid).and_then(|s| s.branching_scheme.as_ref()) {
            Some(rendered) => Ok(Some(rendered.parse()?)),
            None => Ok(None),
        }
    }

    fn set_branching_scheme(&self, scheme: &BranchingScheme) -> Fallible<()> {
        self.update(|section| section.branching_scheme = Some(scheme.to_string()))
    }

    fn get_locations(&self) -> Fallible<BTreeSet<String>> {
        let config = self.load()?;
        Ok(config
            .get(&self.uuid)
            .map(|section| section.locations.iter().cloned().collect())
            .unwrap_or_else(BTreeSet::new))
    }

    fn add_location(&self, location: &str) -> Fallible<()> {
        self.update(|section| {
            if !section.locations.iter().any(|seen| seen == location) {
                section.locations.push(location.to_string());
            }
        })
    }
}

/// In-memory settings, for tests and one-shot runs without a config file.
#[derive(Default)]
pub struct MemRepositoryConfig {
    inner: Mutex<RepoSection>,
}

impl MemRepositoryConfig {
    pub fn new() -> MemRepositoryConfig {
        Default::default()
    }
}

impl RepositoryConfig for MemRepositoryConfig {
    fn get_branching_scheme(&self) -> Fallible<Option<BranchingScheme>> {
        let inner = self.inner.lock().expect("poisoned lock");
        match inner.branching_scheme.as_ref() {
            Some(rendered) => Ok(Some(rendered.parse()?)),
            None => Ok(None),
        }
    }

    fn set_branching_scheme(&self, scheme: &BranchingScheme) -> Fallible<()> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        inner.branching_scheme = Some(scheme.to_string());
        Ok(())
    }

    fn get_locations(&self) -> Fallible<BTreeSet<String>> {
        let inner = self.inner.lock().expect("poisoned lock");
        Ok(inner.locations.iter().cloned().collect())
    }

    fn add_location(&self, location: &str) -> Fallible<()> {
        let mut inner = self.inner.lock().expect("poisoned lock");
        if !inner.locations.iter().any(|seen| seen == location) {
            inner.locations.push(location.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempdir::TempDir;

    #[test]
    fn test_file_config_round_trips() {
        let dir = TempDir::new("svnimport_config").unwrap();
        let file = dir.path().join("subversion.conf");
        let config = FileRepositoryConfig::open(&file, "uuid-a");

        assert!(config.get_branching_scheme().unwrap().is_none());
        config
            .set_branching_scheme(&BranchingScheme::Trunk { level: 1 })
            .unwrap();
        config.add_location("svn://example/a").unwrap();
        config.add_location("svn://example/a").unwrap();
        config.add_location("svn://mirror/a").unwrap();

        let reloaded = FileRepositoryConfig::open(&file, "uuid-a");
        assert_eq!(
            reloaded.get_branching_scheme().unwrap(),
            Some(BranchingScheme::Trunk { level: 1 })
        );
        let locations = reloaded.get_locations().unwrap();
        assert_eq!(locations.len(), 2);
        assert!(locations.contains("svn://example/a"));
    }

    #[test]
    fn test_file_config_sections_are_per_uuid() {
        let dir = TempDir::new("svnimport_config").unwrap();
        let file = dir.path().join("subversion.conf");

        FileRepositoryConfig::open(&file, "uuid-a")
            .set_branching_scheme(&BranchingScheme::Root)
            .unwrap();
        FileRepositoryConfig::open(&file, "uuid-b")
            .set_branching_scheme(&BranchingScheme::Trunk { level: 0 })
            .unwrap();

        assert_eq!(
            FileRepositoryConfig::open(&file, "uuid-a")
                .get_branching_scheme()
                .unwrap(),
            Some(BranchingScheme::Root)
        );
        assert_eq!(
            FileRepositoryConfig::open(&file, "uuid-b")
                .get_branching_scheme()
                .unwrap(),
            Some(BranchingScheme::Trunk { level: 0 })
        );
    }

    #[test]
    fn test_mem_config() {
        let config = MemRepositoryConfig::new();
        assert!(config.get_branching_scheme().unwrap().is_none());
        config
            .set_branching_scheme(&BranchingScheme::List(vec!["stable".to_string()]))
            .unwrap();
        assert_eq!(
            config.get_branching_scheme().unwrap(),
            Some(BranchingScheme::List(vec!["stable".to_string()]))
        );
        config.add_location("somewhere").unwrap();
        config.add_location("somewhere").unwrap();
        assert_eq!(config.get_locations().unwrap().len(), 1);
    }
}
