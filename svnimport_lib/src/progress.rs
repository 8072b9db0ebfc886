// Copyright (c) 2004-present, Facebook, Inc.
// All Rights Reserved.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2 or any later version.

//! Progress reporting for a conversion pass.
//!
//! Reporting is observational only and never gates correctness. The guard
//! finalizes the reporter on drop, so the handle is released on every exit
//! path, including a branch conversion failing mid-pass.

use slog::{debug, info, Logger};

pub trait ProgressReporter {
    fn update(&mut self, text: &str, current: usize, total: usize);

    fn finish(&mut self);
}

/// Reports progress through the conversion logger.
pub struct LogProgress {
    logger: Logger,
}

impl LogProgress {
    pub fn new(logger: Logger) -> LogProgress {
        LogProgress { logger }
    }
}

impl ProgressReporter for LogProgress {
    fn update(&mut self, text: &str, current: usize, total: usize) {
        info!(self.logger, "{} ({}/{})", text, current, total);
    }

    fn finish(&mut self) {
        debug!(self.logger, "progress finished");
    }
}

/// Discards all progress. Useful in tests.
#[derive(Default)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn update(&mut self, _text: &str, _current: usize, _total: usize) {}

    fn finish(&mut self) {}
}

/// Owns a reporter for the duration of one pass; `finish` runs on drop, no
/// matter how the pass ends.
pub struct ProgressGuard {
    reporter: Box<dyn ProgressReporter>,
}

impl ProgressGuard {
    pub fn new(reporter: Box<dyn ProgressReporter>) -> ProgressGuard {
        ProgressGuard { reporter }
    }

    pub fn update(&mut self, text: &str, current: usize, total: usize) {
        self.reporter.update(text, current, total);
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.reporter.finish();
    }
}
