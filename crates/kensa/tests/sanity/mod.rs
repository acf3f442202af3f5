use kensa::{loader, sanity, CollectingFeedback, ErrorKind};

use crate::{live_mpd, video_set, AssertWrapper};

fn check(body: &str) -> kensa::KensaResult<()> {
    let manifest =
        loader::load(&live_mpd("PT30S", body), &mut CollectingFeedback::new()).assert_success();
    sanity::check(&manifest)
}

#[test]
fn test_fixture_is_sane() {
    let data = include_str!("../fixtures/live-two-periods.mpd");
    let manifest = loader::load(data, &mut CollectingFeedback::new()).assert_success();
    sanity::check(&manifest).assert_success();
}

#[test]
fn test_manifest_without_periods() {
    let error = check("").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
}

#[test]
fn test_period_without_adaptation_sets() {
    let body = format!(
        r#"<Period id="p0" start="PT0S">{}</Period>
    <Period id="p1" start="PT10S"/>"#,
        video_set(&[(0, 10)])
    );

    let error = check(&body).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
    assert!(error.to_string().contains("period 'p1'"));
}

#[test]
fn test_adaptation_set_without_representations() {
    let body = r#"<Period id="p0" start="PT0S">
      <AdaptationSet mimeType="text/vtt">
        <SegmentTemplate timescale="1">
          <SegmentTimeline><S t="0" d="10"/></SegmentTimeline>
        </SegmentTemplate>
      </AdaptationSet>
    </Period>"#;

    let error = check(body).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnsupportedFeature);
    assert!(error.to_string().contains("text/vtt"));
}
