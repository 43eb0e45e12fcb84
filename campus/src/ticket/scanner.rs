//! Continuous scanning.
//!
//! A camera produces an endless run of decode attempts, most of them misses
//! and many of them the same ticket seen frame after frame. [`ScanFilter`]
//! turns that run into distinct reads; [`scan`] does the same for an async
//! frame source.

use super::codec::TicketCodec;
use futures::{Stream, StreamExt};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Which earlier reads suppress a new one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedupPolicy {
    /// Suppress a read equal to the last reported value
    #[default]
    LastValue,
    /// Suppress any value reported before
    AllSeen,
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(Self::LastValue),
            "all" => Ok(Self::AllSeen),
            other => Err(other.to_string()),
        }
    }
}

/// Deduplicates raw decode attempts
#[derive(Debug, Default)]
pub struct ScanFilter {
    policy: DedupPolicy,
    last: Option<String>,
    seen: HashSet<String>,
}

impl ScanFilter {
    /// Create a filter with the given policy
    #[must_use]
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            last: None,
            seen: HashSet::new(),
        }
    }

    /// Feed one decode attempt; returns the value if it should be reported
    ///
    /// `None` attempts (no symbol in the frame) and empty strings are ignored
    /// and do not reset the last reported value.
    pub fn observe(&mut self, attempt: Option<String>) -> Option<String> {
        let value = attempt.filter(|v| !v.is_empty())?;

        let fresh = match self.policy {
            DedupPolicy::LastValue => self.last.as_deref() != Some(value.as_str()),
            DedupPolicy::AllSeen => !self.seen.contains(&value),
        };
        if !fresh {
            tracing::trace!(value = %value, "Duplicate scan suppressed");
            return None;
        }

        if self.policy == DedupPolicy::AllSeen {
            self.seen.insert(value.clone());
        }
        self.last = Some(value.clone());
        tracing::debug!(value = %value, "Scanned ticket");
        Some(value)
    }

    /// Run `attempts` through the filter, calling `on_ticket` for each new read
    pub fn drive<I, F>(&mut self, attempts: I, mut on_ticket: F)
    where
        I: IntoIterator<Item = Option<String>>,
        F: FnMut(&str),
    {
        for attempt in attempts {
            if let Some(value) = self.observe(attempt) {
                on_ticket(&value);
            }
        }
    }

    /// Last value reported
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

/// Turn a stream of decode attempts into a stream of new distinct reads
///
/// The source is consumed once; the returned stream ends when it does.
pub fn scan<S>(attempts: S, policy: DedupPolicy) -> impl Stream<Item = String>
where
    S: Stream<Item = Option<String>>,
{
    async_stream::stream! {
        let mut filter = ScanFilter::new(policy);
        futures::pin_mut!(attempts);
        while let Some(attempt) = attempts.next().await {
            if let Some(value) = filter.observe(attempt) {
                yield value;
            }
        }
    }
}

/// Decode each captured frame, yielding one attempt per frame
pub fn decode_frames<S>(codec: TicketCodec, frames: S) -> impl Stream<Item = Option<String>>
where
    S: Stream<Item = RgbaImage>,
{
    frames.map(move |frame| codec.decode(&frame))
}
