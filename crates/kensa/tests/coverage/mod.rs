use chrono::TimeDelta;
use kensa::{
    coverage::{self, find_gaps, GapKind},
    loader, CollectingFeedback,
};

use crate::{live_mpd, timestamp, video_set, AssertWrapper};

fn load(document: &str) -> kensa::Manifest {
    loader::load(document, &mut CollectingFeedback::new()).assert_success()
}

#[test]
fn test_trailing_gap_in_open_period() {
    let body = format!(r#"<Period id="p0" start="PT0S">{}</Period>"#, video_set(&[(0, 10), (10, 10)]));
    let manifest = load(&live_mpd("PT30S", &body));
    let now = timestamp("2024-01-01T00:00:25Z");

    let report = find_gaps(&manifest, now);
    let timeline_gaps: Vec<_> = report.gaps().filter(|gap| gap.timeline.is_some()).collect();
    assert_eq!(timeline_gaps.len(), 1);
    assert_eq!(timeline_gaps[0].kind, GapKind::BeforeNow);
    assert_eq!(timeline_gaps[0].start, timestamp("2024-01-01T00:00:20Z"));
    assert_eq!(timeline_gaps[0].end, now);
    assert_eq!(timeline_gaps[0].length(), TimeDelta::milliseconds(5000));

    let mut feedback = CollectingFeedback::new();
    coverage::check(&manifest, now, &mut feedback);
    assert!(feedback.invalid_contents().any(|message| {
        message.starts_with("Gap of 5000 ms")
            && message.contains("adaptation set #0 (video/mp4) of period 'p0'")
    }));
}

#[test]
fn test_gapless_window() {
    let body = format!(
        r#"<Period id="p0" start="PT0S">{}</Period>"#,
        video_set(&[(0, 10), (10, 10), (20, 10)])
    );
    let manifest = load(&live_mpd("PT10S", &body));

    let mut feedback = CollectingFeedback::new();
    coverage::check(&manifest, timestamp("2024-01-01T00:00:25Z"), &mut feedback);
    assert_eq!(feedback.invalid_content_count(), 0);
    // The first segment ends before the window starts
    assert_eq!(feedback.infos().count(), 1);
}

#[test]
fn test_discontinuity() {
    let body = format!(
        r#"<Period id="p0" start="PT0S">{}</Period>"#,
        video_set(&[(0, 10), (12, 10), (22, 10)])
    );
    let manifest = load(&live_mpd("PT20S", &body));

    let report = find_gaps(&manifest, timestamp("2024-01-01T00:00:25Z"));
    let gaps: Vec<_> = report.gaps().collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].kind, GapKind::BeforeSegment);
    assert_eq!(gaps[0].length(), TimeDelta::seconds(2));
    assert_eq!(gaps[0].start, timestamp("2024-01-01T00:00:10Z"));
}

#[test]
fn test_computed_duration_drives_clipping() {
    // p0 claims 30s but p1 starts at 20s: the segment running to 24s is clipped, no overlap
    // is reported and p1 has to cover from 20s on.
    let body = format!(
        r#"<Period id="p0" start="PT0S" duration="PT30S">{}</Period>
    <Period id="p1" start="PT20S">{}</Period>"#,
        video_set(&[(0, 12), (12, 12)]),
        video_set(&[(0, 10)]),
    );
    let manifest = load(&live_mpd("PT30S", &body));

    let report = find_gaps(&manifest, timestamp("2024-01-01T00:00:30Z"));
    assert!(report.is_gapless(), "{:?}", report.findings);
}

#[test]
fn test_period_ends_before_timeline() {
    let body = format!(
        r#"<Period id="p0" start="PT0S">{}</Period>
    <Period id="p1" start="PT20S">{}</Period>"#,
        video_set(&[(0, 10), (10, 5)]),
        video_set(&[(0, 10)]),
    );
    let manifest = load(&live_mpd("PT30S", &body));

    let report = find_gaps(&manifest, timestamp("2024-01-01T00:00:30Z"));
    let gaps: Vec<_> = report.gaps().collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].kind, GapKind::BeforePeriodEnd);
    assert_eq!(gaps[0].start, timestamp("2024-01-01T00:00:15Z"));
    assert_eq!(gaps[0].end, timestamp("2024-01-01T00:00:20Z"));
}

#[test]
fn test_segments_past_period_end_are_ignored() {
    let body = format!(
        r#"<Period id="p0" start="PT0S">{}</Period>
    <Period id="p1" start="PT20S">{}</Period>"#,
        video_set(&[(0, 10), (10, 10), (25, 10)]),
        video_set(&[(0, 10)]),
    );
    let manifest = load(&live_mpd("PT30S", &body));

    let report = find_gaps(&manifest, timestamp("2024-01-01T00:00:30Z"));
    assert!(report.is_gapless());
    let ignored: Vec<_> = report.ignored().collect();
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0].future, 1);
    assert_eq!(ignored[0].past, 0);
}

#[test]
fn test_last_period_ends_before_now() {
    let body = format!(
        r#"<Period id="p0" start="PT0S" duration="PT20S">{}</Period>"#,
        video_set(&[(0, 10), (10, 10)]),
    );
    let manifest = load(&live_mpd("PT30S", &body));

    let report = find_gaps(&manifest, timestamp("2024-01-01T00:00:25Z"));
    let kinds: Vec<_> = report.gaps().map(|gap| gap.kind).collect();
    assert_eq!(kinds, vec![GapKind::BeforeFirstPeriod, GapKind::AfterLastPeriod]);
}

#[test]
fn test_representation_timelines_are_checked_separately() {
    let body = r#"<Period id="p0" start="PT0S">
      <AdaptationSet mimeType="audio/mp4">
        <Representation id="a1">
          <SegmentTemplate timescale="48000">
            <SegmentTimeline><S t="0" d="480000" r="2"/></SegmentTimeline>
          </SegmentTemplate>
        </Representation>
        <Representation id="a2">
          <SegmentTemplate timescale="48000">
            <SegmentTimeline><S t="0" d="480000"/><S t="960000" d="480000"/></SegmentTimeline>
          </SegmentTemplate>
        </Representation>
      </AdaptationSet>
    </Period>"#;
    let manifest = load(&live_mpd("PT30S", body));

    let mut feedback = CollectingFeedback::new();
    coverage::check(&manifest, timestamp("2024-01-01T00:00:30Z"), &mut feedback);
    let invalid: Vec<_> = feedback.invalid_contents().collect();
    assert_eq!(invalid.len(), 1);
    assert!(invalid[0].starts_with("Gap of 10000 ms"));
    assert!(invalid[0].contains("representation 'a2'"));
}

#[test]
fn test_presentation_time_offset() {
    // Media time 90000 at timescale 90000 maps to the period start
    let body = r#"<Period id="p0" start="PT10S">
      <AdaptationSet mimeType="video/mp4" segmentAlignment="true">
        <SegmentTemplate timescale="90000" presentationTimeOffset="90000">
          <SegmentTimeline><S t="90000" d="180000" r="4"/></SegmentTimeline>
        </SegmentTemplate>
        <Representation id="v1"/>
      </AdaptationSet>
    </Period>"#;
    let manifest = load(&live_mpd("PT10S", body));

    let report = find_gaps(&manifest, timestamp("2024-01-01T00:00:20Z"));
    assert!(report.is_gapless(), "{:?}", report.findings);

    let report = find_gaps(&manifest, timestamp("2024-01-01T00:00:21Z"));
    let gaps: Vec<_> = report.gaps().collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].kind, GapKind::BeforeNow);
    assert_eq!(gaps[0].length(), TimeDelta::seconds(1));
}

#[test]
fn test_check_is_idempotent() {
    let body = format!(
        r#"<Period id="p0" start="PT0S">{}</Period>"#,
        video_set(&[(0, 10), (12, 5)])
    );
    let manifest = load(&live_mpd("PT30S", &body));
    let now = timestamp("2024-01-01T00:00:25Z");

    let mut first = CollectingFeedback::new();
    coverage::check(&manifest, now, &mut first);
    let mut second = CollectingFeedback::new();
    coverage::check(&manifest, now, &mut second);

    assert_eq!(first.events(), second.events());
    assert_eq!(find_gaps(&manifest, now), find_gaps(&manifest, now));
}
