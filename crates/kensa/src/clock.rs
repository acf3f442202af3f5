use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use url::Url;

use crate::{http::Fetcher, time::Timestamp, KensaResult};

/// Wall clock synchronized against an `urn:mpeg:dash:utc:http-iso:2014` time source.
///
/// The validator and the packager may disagree on local time, so every timing decision
/// is made against this clock instead of [`Utc::now`].
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    /// Authoritative time returned by the time source
    remote_now: Timestamp,
    /// Local instant the response was received at
    received_at: Instant,
}

impl Clock {
    pub fn new(remote_now: Timestamp, received_at: Instant) -> Self {
        Self {
            remote_now,
            received_at,
        }
    }

    /// Fetch the authoritative time. The whole response body is an ISO-8601 timestamp.
    pub async fn sync<F>(fetcher: &F, url: &Url) -> KensaResult<Self>
    where
        F: Fetcher,
    {
        tracing::debug!(%url, "Synchronizing clock");
        let text = fetcher.fetch_text(url).await?;
        let received_at = Instant::now();
        let remote_now = parse_iso8601_response(text.trim())?;

        // How much time the local clock is behind the remote clock
        let offset = remote_now - Utc::now();
        tracing::info!(offset_milliseconds = %offset.num_milliseconds(), "Clock time set to {}, offset calculated", remote_now);

        Ok(Self::new(remote_now, received_at))
    }

    /// Synchronized time at an earlier local instant, such as the moment the manifest
    /// finished downloading.
    pub fn time_at(&self, instant: Instant) -> KensaResult<Timestamp> {
        let elapsed = self.received_at.saturating_duration_since(instant);
        Ok(self.remote_now - TimeDelta::from_std(elapsed)?)
    }
}

pub fn parse_iso8601_response(response_text: &str) -> KensaResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(response_text)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Timestamps without any zone designator are UTC
            chrono::NaiveDateTime::parse_from_str(response_text, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.and_utc())
        })?)
}
