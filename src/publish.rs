//! "Time or change" publish trigger.
//!
//! The pub/sub layer asks every loop whether a data source should be sent.
//! Building a snapshot drains buffers and costs a JSON render, so the
//! trigger compares the cheap fingerprint first:
//!
//! ```text
//!  fingerprint changed && min_interval passed  ──▶ publish
//!  max_interval passed                         ──▶ publish (keep-alive)
//!  otherwise                                   ──▶ skip, snapshot not built
//! ```

use log::debug;

use crate::app::ports::{DataSource, PublishPort};
use crate::fingerprint::Fingerprint;
use crate::timing::has_elapsed;

pub const DEFAULT_MIN_INTERVAL_MS: u32 = 10;
pub const DEFAULT_MAX_INTERVAL_MS: u32 = 1_000;

#[derive(Debug, Clone)]
pub struct ChangePublisher {
    min_interval_ms: u32,
    max_interval_ms: u32,
    last_publish_ms: Option<u32>,
    last_fingerprint: Option<Fingerprint>,
    published: u32,
}

impl Default for ChangePublisher {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL_MS, DEFAULT_MAX_INTERVAL_MS)
    }
}

impl ChangePublisher {
    pub fn new(min_interval_ms: u32, max_interval_ms: u32) -> Self {
        Self {
            min_interval_ms,
            max_interval_ms: max_interval_ms.max(min_interval_ms),
            last_publish_ms: None,
            last_fingerprint: None,
            published: 0,
        }
    }

    /// Publish `source` through `port` if it is due.  Returns `true` when
    /// a snapshot was built and sent.
    pub fn poll<S, P>(&mut self, now_ms: u32, source: &mut S, port: &mut P) -> bool
    where
        S: DataSource + ?Sized,
        P: PublishPort + ?Sized,
    {
        let fingerprint = source.fingerprint();
        if !self.is_due(now_ms, &fingerprint) {
            return false;
        }

        let payload = source.snapshot();
        port.publish(source.name(), &payload);
        debug!("{}: published {} bytes", source.name(), payload.len());

        self.last_publish_ms = Some(now_ms);
        self.last_fingerprint = Some(fingerprint);
        self.published = self.published.wrapping_add(1);
        true
    }

    /// Snapshots sent so far.
    pub fn published(&self) -> u32 {
        self.published
    }

    fn is_due(&self, now_ms: u32, fingerprint: &Fingerprint) -> bool {
        let Some(last) = self.last_publish_ms else {
            return true;
        };
        if has_elapsed(now_ms, last, self.max_interval_ms) {
            return true;
        }
        let changed = self.last_fingerprint.as_ref() != Some(fingerprint);
        changed && has_elapsed(now_ms, last, self.min_interval_ms)
    }
}
