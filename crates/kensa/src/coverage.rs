//! Timeline coverage verification.
//!
//! Every instant of the playback window, `now - MPD@timeShiftBufferDepth` up to `now`,
//! must be covered by a period, and within each period every timeline must be gapless
//! from the later of the period start and the window start up to the period end (or up
//! to `now` for an open-ended period).
//!
//! Segments may extend past the end of their period, as the next period is allowed to
//! cut the current one short. Such overlap is clipped at the period end and never
//! reported. Anything uncovered inside a timeline is a defect.
use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    feedback::ValidationFeedback,
    model::{Manifest, PeriodId, Timeline},
    time::{format_timestamp, Timestamp},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    /// The first period starts after the playback window start.
    BeforeFirstPeriod,
    /// The last period ends before `now`.
    AfterLastPeriod,
    /// A timeline has nothing at the start of the playback window.
    AtWindowStart,
    /// A timeline has no content before one of its segments.
    BeforeSegment,
    /// A timeline ends before the end of its period.
    BeforePeriodEnd,
    /// A timeline of an open-ended period ends before `now`.
    BeforeNow,
}

/// An uncovered time span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub kind: GapKind,
    pub start: Timestamp,
    pub end: Timestamp,
    pub period: PeriodId,
    /// `None` for gaps between periods and the playback window.
    pub timeline: Option<Timeline>,
}

impl Gap {
    pub fn length(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn message(&self, manifest: &Manifest) -> String {
        let length = self.length().num_milliseconds();
        let start = format_timestamp(self.start);
        let end = format_timestamp(self.end);
        let timeline = self
            .timeline
            .map(|timeline| manifest.describe_owner(timeline.owner))
            .unwrap_or_default();
        let period = manifest.describe_period(self.period);

        match self.kind {
            GapKind::BeforeFirstPeriod => format!(
                "Gap of {length} ms between the playback window start ({start}) and the start of the first period, {period} ({end})"
            ),
            GapKind::AfterLastPeriod => format!(
                "Gap of {length} ms between the end of the last period, {period} ({start}) and the end of the playback window ({end})"
            ),
            GapKind::AtWindowStart => format!(
                "Gap of {length} ms in {timeline}: the playback window starts at {start} but the first available segment starts at {end}"
            ),
            GapKind::BeforeSegment => format!(
                "Gap of {length} ms in {timeline}: no content between {start} and the segment starting at {end}"
            ),
            GapKind::BeforePeriodEnd => format!(
                "Gap of {length} ms in {timeline}: content ends at {start} but the period ends at {end}"
            ),
            GapKind::BeforeNow => format!(
                "Gap of {length} ms in {timeline}: content ends at {start} but the playback window ends at {end}"
            ),
        }
    }
}

/// Segments of one timeline that lie outside of what had to be covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoredSegments {
    pub timeline: Timeline,
    /// Segments ending before the covered content, usually before the window start.
    pub past: usize,
    /// Segments starting after the end of their period.
    pub future: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Gap(Gap),
    Ignored(IgnoredSegments),
    /// The period ends before the playback window starts.
    PeriodOutsideWindow(PeriodId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageReport {
    pub now: Timestamp,
    pub window_start: Timestamp,
    /// Findings in the order they were discovered.
    pub findings: Vec<Finding>,
}

impl CoverageReport {
    pub fn gaps(&self) -> impl Iterator<Item = &Gap> {
        self.findings.iter().filter_map(|finding| match finding {
            Finding::Gap(gap) => Some(gap),
            _ => None,
        })
    }

    pub fn ignored(&self) -> impl Iterator<Item = &IgnoredSegments> {
        self.findings.iter().filter_map(|finding| match finding {
            Finding::Ignored(ignored) => Some(ignored),
            _ => None,
        })
    }

    pub fn is_gapless(&self) -> bool {
        self.gaps().next().is_none()
    }
}

/// Verify the manifest at `now` and report every gap through `feedback`.
pub fn check(manifest: &Manifest, now: Timestamp, feedback: &mut impl ValidationFeedback) {
    let report = find_gaps(manifest, now);
    tracing::debug!(
        now = %report.now,
        window_start = %report.window_start,
        findings = report.findings.len(),
        "Timeline coverage checked"
    );

    for finding in report.findings.iter() {
        match finding {
            Finding::Gap(gap) => feedback.invalid_content(&gap.message(manifest)),
            Finding::Ignored(ignored) => feedback.info(&format!(
                "Ignored {} segment(s) before the covered content and {} segment(s) after the period end in {}",
                ignored.past,
                ignored.future,
                manifest.describe_owner(ignored.timeline.owner)
            )),
            Finding::PeriodOutsideWindow(period) => feedback.info(&format!(
                "{} ends before the playback window starts ({}), its timelines are not checked",
                manifest.describe_period(*period),
                format_timestamp(report.window_start)
            )),
        }
    }
}

/// Compute every coverage defect of the manifest at `now`.
pub fn find_gaps(manifest: &Manifest, now: Timestamp) -> CoverageReport {
    let window_start = now
        .checked_sub_signed(manifest.playback_window_length)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut findings = Vec::new();

    if let Some(first) = manifest.first_period() {
        let first_start = manifest.period_start(first);
        if first_start > window_start {
            findings.push(Finding::Gap(Gap {
                kind: GapKind::BeforeFirstPeriod,
                start: window_start,
                end: first_start,
                period: first,
                timeline: None,
            }));
        }
    }

    if let Some(last) = manifest.last_period() {
        if let Some(last_end) = manifest.period_end(last) {
            if last_end < now {
                findings.push(Finding::Gap(Gap {
                    kind: GapKind::AfterLastPeriod,
                    start: last_end,
                    end: now,
                    period: last,
                    timeline: None,
                }));
            }
        }
    }

    for (period, _) in manifest.periods() {
        if let Some(period_end) = manifest.period_end(period) {
            if period_end <= window_start {
                findings.push(Finding::PeriodOutsideWindow(period));
                continue;
            }
        }

        for timeline in manifest.timelines(period) {
            check_timeline(manifest, period, timeline, window_start, now, &mut findings);
        }
    }

    CoverageReport {
        now,
        window_start,
        findings,
    }
}

fn check_timeline(
    manifest: &Manifest,
    period: PeriodId,
    timeline: Timeline,
    window_start: Timestamp,
    now: Timestamp,
    findings: &mut Vec<Finding>,
) {
    let period_end = manifest.period_end(period);
    let template = manifest.template(timeline.template);

    // Content before the window is irrelevant
    let mut covered = manifest.period_start(period).max(window_start);
    let mut ignored_past = 0;
    let mut ignored_future = 0;

    let gap = |kind, start, end| {
        Finding::Gap(Gap {
            kind,
            start,
            end,
            period,
            timeline: Some(timeline),
        })
    };

    for segment in template.segments() {
        let start = manifest.segment_start(timeline.template, segment);
        let end = manifest.segment_end(timeline.template, segment);

        if end <= covered {
            ignored_past += 1;
            continue;
        }

        if period_end.is_some_and(|period_end| start > period_end) {
            ignored_future += 1;
            continue;
        }

        if start > covered {
            let kind = if covered == window_start {
                GapKind::AtWindowStart
            } else {
                GapKind::BeforeSegment
            };
            findings.push(gap(kind, covered, start));
        }

        covered = match period_end {
            Some(period_end) => end.min(period_end),
            None => end,
        };
    }

    match period_end {
        Some(period_end) if covered < period_end => {
            findings.push(gap(GapKind::BeforePeriodEnd, covered, period_end))
        }
        None if covered < now => findings.push(gap(GapKind::BeforeNow, covered, now)),
        _ => {}
    }

    if ignored_past > 0 || ignored_future > 0 {
        findings.push(Finding::Ignored(IgnoredSegments {
            timeline,
            past: ignored_past,
            future: ignored_future,
        }));
    }

    tracing::trace!(
        timeline = %manifest.describe_owner(timeline.owner),
        segments = template.segments().len(),
        ignored_past,
        ignored_future,
        covered_until = %covered,
        "Timeline walked"
    );
}
