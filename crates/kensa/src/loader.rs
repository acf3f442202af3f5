//! Builds the [`Manifest`] graph from an MPD document.
//!
//! The raw XML is handled by `dash-mpd`; this module only maps its output onto the
//! timing model, enforcing the attributes the coverage check depends on.
use chrono::TimeDelta;
use dash_mpd::{UTCTiming, MPD, S};

use crate::{
    feedback::ValidationFeedback,
    model::{AdaptationSetId, Manifest, Period, PeriodId, SegmentTemplate, TemplateOwner, TimelineSegment},
    time::Timescale,
    KensaError, KensaResult,
};

/// The only clock synchronization scheme the validator understands.
pub const HTTP_ISO_SCHEME: &str = "urn:mpeg:dash:utc:http-iso:2014";

/// Upper bound on the segments a single `SegmentTimeline` may expand to.
pub const MAX_TIMELINE_SEGMENTS: usize = 1_000_000;

/// Parse an MPD document and build the manifest graph from it.
pub fn load(document: &str, feedback: &mut impl ValidationFeedback) -> KensaResult<Manifest> {
    let mpd = dash_mpd::parse(document)?;
    from_mpd(mpd, feedback)
}

/// Build the manifest graph from an already parsed MPD.
pub fn from_mpd(mpd: MPD, feedback: &mut impl ValidationFeedback) -> KensaResult<Manifest> {
    match mpd.mpdtype.as_deref() {
        Some("dynamic") => {}
        other => {
            return Err(KensaError::UnsupportedFeature(format!(
                "only dynamic manifests can be validated, MPD@type is {}",
                other.unwrap_or("static (default)")
            )))
        }
    }

    let availability_start_time = mpd.availabilityStartTime.ok_or_else(|| {
        KensaError::MpdParsing("missing MPD@availabilityStartTime".to_string())
    })?;
    let playback_window_length = mpd
        .timeShiftBufferDepth
        .ok_or_else(|| KensaError::MpdParsing("missing MPD@timeShiftBufferDepth".to_string()))?;

    let mut manifest = Manifest::new(
        availability_start_time,
        TimeDelta::from_std(playback_window_length)?,
    );
    manifest.publish_time = mpd.publishTime;
    manifest.manifest_refresh_interval = mpd
        .minimumUpdatePeriod
        .map(TimeDelta::from_std)
        .transpose()?;
    manifest.time_sync_url = select_time_sync_url(&mpd.UTCTiming, feedback);

    let mut previous: Option<PeriodId> = None;
    for (index, period) in mpd.periods.into_iter().enumerate() {
        // A period without @start begins where the previous one ends
        let start_offset_from_ast = match (period.start, previous) {
            (Some(start), _) => TimeDelta::from_std(start)?,
            (None, Some(previous)) => {
                let previous = manifest.period(previous);
                let duration = previous.duration.ok_or_else(|| {
                    KensaError::MpdParsing(format!(
                        "period #{index} has no @start and the period before it has no @duration"
                    ))
                })?;
                previous
                    .start_offset_from_ast
                    .checked_add(&duration)
                    .ok_or_else(|| {
                        KensaError::MpdParsing(format!(
                            "start of period #{index} is out of the supported time range"
                        ))
                    })?
            }
            (None, None) => {
                return Err(KensaError::MpdParsing(
                    "missing @start on the first period".to_string(),
                ))
            }
        };

        let mut model = Period::new(period.id, start_offset_from_ast);
        model.duration = period.duration.map(TimeDelta::from_std).transpose()?;
        let period_id = manifest.push_period(model);
        previous = Some(period_id);

        if period.SegmentTemplate.is_some() {
            feedback.will_skip_some_data(&format!(
                "SegmentTemplate declared directly on {} is ignored",
                manifest.describe_period(period_id)
            ));
        }

        tracing::debug!(
            period = %manifest.describe_period(period_id),
            start = %manifest.period_start(period_id),
            adaptation_sets = period.adaptations.len(),
            "Loading period"
        );

        for adaptation in period.adaptations {
            let set_id = manifest.push_adaptation_set(
                period_id,
                adaptation.mimeType,
                adaptation.segmentAlignment.unwrap_or(false),
            );

            let has_shared_template = match adaptation.SegmentTemplate {
                Some(template) => {
                    let owner = TemplateOwner::AdaptationSet(set_id);
                    let template = build_template(&template, &manifest.describe_owner(owner))?;
                    manifest.attach_template(owner, template);
                    true
                }
                None => false,
            };

            for representation in adaptation.representations {
                let representation_id = manifest.push_representation(set_id, representation.id);
                let owner = TemplateOwner::Representation(representation_id);
                match (representation.SegmentTemplate, has_shared_template) {
                    (Some(_), true) => {
                        return Err(KensaError::UnsupportedFeature(format!(
                            "{} declares a SegmentTemplate although its adaptation set already shares one",
                            manifest.describe_owner(owner)
                        )))
                    }
                    (None, false) => {
                        return Err(KensaError::UnsupportedFeature(format!(
                            "{} has no SegmentTemplate and its adaptation set does not share one",
                            manifest.describe_owner(owner)
                        )))
                    }
                    (Some(template), false) => {
                        let template = build_template(&template, &manifest.describe_owner(owner))?;
                        manifest.attach_template(owner, template);
                    }
                    (None, true) => {}
                }
            }

            log_adaptation_set(&manifest, set_id);
        }
    }

    assign_period_durations(&mut manifest, feedback);
    check_timing(&manifest)?;

    Ok(manifest)
}

/// Every instant the coverage check derives must be representable on the wall clock.
fn check_timing(manifest: &Manifest) -> KensaResult<()> {
    let out_of_range =
        |what: String| KensaError::MpdParsing(format!("{what} is out of the supported time range"));

    // The window of any "now" after the availability start begins no earlier than this
    manifest
        .availability_start_time
        .checked_sub_signed(manifest.playback_window_length)
        .ok_or_else(|| out_of_range("MPD@timeShiftBufferDepth".to_string()))?;

    for (id, period) in manifest.periods() {
        let start = manifest
            .availability_start_time
            .checked_add_signed(period.start_offset_from_ast)
            .ok_or_else(|| out_of_range(format!("start of {}", manifest.describe_period(id))))?;
        if let Some(duration) = period.duration {
            start
                .checked_add_signed(duration)
                .ok_or_else(|| out_of_range(format!("end of {}", manifest.describe_period(id))))?;
        }

        for timeline in manifest.timelines(id) {
            let template = manifest.template(timeline.template);
            for (index, segment) in template.segments().iter().enumerate() {
                let describe = || {
                    format!(
                        "segment #{index} of {}",
                        manifest.describe_owner(timeline.owner)
                    )
                };
                template
                    .start_offset_from_period_start(segment)
                    .and_then(|offset| start.checked_add_signed(offset))
                    .and_then(|segment_start| {
                        let duration = template.segment_duration(segment)?;
                        segment_start.checked_add_signed(duration)
                    })
                    .ok_or_else(|| out_of_range(describe()))?;
            }
        }
    }

    Ok(())
}

fn log_adaptation_set(manifest: &Manifest, set_id: AdaptationSetId) {
    let set = manifest.adaptation_set(set_id);
    tracing::trace!(
        adaptation_set = %manifest.describe_owner(TemplateOwner::AdaptationSet(set_id)),
        representations = set.representations().len(),
        shared_template = set.template().is_some(),
        "Loaded adaptation set"
    );
}

/// Pick the authoritative http-iso time source. When several are declared the last one wins.
fn select_time_sync_url(
    timings: &[UTCTiming],
    feedback: &mut impl ValidationFeedback,
) -> Option<String> {
    let mut candidates = Vec::new();
    for timing in timings {
        if timing.schemeIdUri != HTTP_ISO_SCHEME {
            feedback.info(&format!(
                "Ignoring UTCTiming with unsupported scheme {}",
                timing.schemeIdUri
            ));
            continue;
        }

        match timing.value.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => candidates.push(value.to_string()),
            _ => feedback.will_skip_some_data(&format!(
                "UTCTiming with scheme {HTTP_ISO_SCHEME} has no value and is ignored"
            )),
        }
    }

    let selected = candidates.pop();
    if let Some(url) = &selected {
        if !candidates.is_empty() {
            feedback.will_skip_some_data(&format!(
                "Manifest declares {} UTCTiming elements with scheme {HTTP_ISO_SCHEME}, only the last one ({url}) is used",
                candidates.len() + 1
            ));
        }
    }
    selected
}

/// Every period but the last lasts until the next one starts, whatever its own
/// @duration says. The last period keeps its explicit duration, if any.
fn assign_period_durations(manifest: &mut Manifest, feedback: &mut impl ValidationFeedback) {
    let periods: Vec<(PeriodId, TimeDelta, Option<TimeDelta>)> = manifest
        .periods()
        .map(|(id, period)| (id, period.start_offset_from_ast, period.duration))
        .collect();

    for pair in periods.windows(2).rev() {
        let (current, current_start, declared) = pair[0];
        let (_, next_start, _) = pair[1];
        let derived = next_start - current_start;

        if derived < TimeDelta::zero() {
            feedback.info(&format!(
                "{} starts after the period that follows it",
                manifest.describe_period(current)
            ));
        }
        if let Some(declared) = declared.filter(|declared| *declared != derived) {
            feedback.info(&format!(
                "{} declares a duration of {} ms, using {} ms up to the start of the next period",
                manifest.describe_period(current),
                declared.num_milliseconds(),
                derived.num_milliseconds()
            ));
        }

        manifest.period_mut(current).duration = Some(derived);
    }
}

fn build_template(
    template: &dash_mpd::SegmentTemplate,
    owner: &str,
) -> KensaResult<SegmentTemplate> {
    let timescale = template.timescale.ok_or_else(|| {
        KensaError::MpdParsing(format!("missing SegmentTemplate@timescale on {owner}"))
    })?;
    let timescale = Timescale::new(timescale).ok_or_else(|| {
        KensaError::MpdParsing(format!("SegmentTemplate@timescale on {owner} is zero"))
    })?;
    let timeline = template.SegmentTimeline.as_ref().ok_or_else(|| {
        KensaError::UnsupportedFeature(format!(
            "SegmentTemplate on {owner} has no SegmentTimeline"
        ))
    })?;

    let entries: Vec<TimelineEntry> = timeline.segments.iter().map(TimelineEntry::from).collect();
    let segments = expand_timeline(&entries)
        .map_err(|error| match error {
            KensaError::MpdParsing(message) => KensaError::MpdParsing(format!("{message} on {owner}")),
            KensaError::UnsupportedFeature(message) => {
                KensaError::UnsupportedFeature(format!("{message} on {owner}"))
            }
            other => other,
        })?;

    let mut result = SegmentTemplate::new(
        timescale,
        template.presentationTimeOffset.unwrap_or(0),
        segments,
    );
    result.initialization = template.initialization.clone();
    result.media = template.media.clone();
    Ok(result)
}

/// A single `S` element of a `SegmentTimeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Start tick. May be omitted after the first entry, continuing the previous one.
    pub t: Option<u64>,
    /// Duration in ticks.
    pub d: u64,
    /// Number of additional segments with the same duration.
    pub r: Option<i64>,
}

impl From<&S> for TimelineEntry {
    fn from(s: &S) -> Self {
        Self {
            t: s.t,
            d: s.d,
            r: s.r,
        }
    }
}

/// Flatten timeline entries into one segment per repetition.
///
/// > Only additional segment references are counted by @r, so S@r=5 indicates a total of
/// > 6 consecutive media segments with the same duration.
pub fn expand_timeline(entries: &[TimelineEntry]) -> KensaResult<Vec<TimelineSegment>> {
    let overflow = || KensaError::MpdParsing("SegmentTimeline exceeds the tick range".to_string());

    let mut segments = Vec::new();
    let mut next_start: Option<u64> = None;
    for (index, entry) in entries.iter().enumerate() {
        let start = entry.t.or(next_start).ok_or_else(|| {
            KensaError::MpdParsing(format!("missing S@t on timeline entry #{index}"))
        })?;
        let repeat = entry.r.unwrap_or(0);
        let repeat = u64::try_from(repeat).map_err(|_| {
            KensaError::UnsupportedFeature(format!(
                "open-ended S@r={repeat} on timeline entry #{index}"
            ))
        })?;

        let total = usize::try_from(repeat)
            .ok()
            .and_then(|repeat| segments.len().checked_add(repeat)?.checked_add(1))
            .filter(|total| *total <= MAX_TIMELINE_SEGMENTS);
        if total.is_none() {
            return Err(KensaError::UnsupportedFeature(format!(
                "timeline entry #{index} expands beyond {MAX_TIMELINE_SEGMENTS} segments"
            )));
        }

        for i in 0..=repeat {
            let offset = i.checked_mul(entry.d).ok_or_else(overflow)?;
            let segment_start = start.checked_add(offset).ok_or_else(overflow)?;
            segment_start.checked_add(entry.d).ok_or_else(overflow)?;
            segments.push(TimelineSegment::new(segment_start, entry.d));
        }

        let run = (repeat + 1).checked_mul(entry.d).ok_or_else(overflow)?;
        next_start = Some(start.checked_add(run).ok_or_else(overflow)?);
    }

    Ok(segments)
}
