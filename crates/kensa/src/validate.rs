use std::time::Instant;

use url::Url;

use crate::{
    clock::Clock, coverage, feedback::ValidationFeedback, http::Fetcher, loader, model::Manifest,
    sanity, time::format_timestamp, KensaError, KensaResult,
};

/// Validate the live manifest at `manifest_url`.
///
/// Defects found in the timeline are reported through `feedback`; only conditions that
/// prevent the check from running at all are returned as errors.
pub async fn validate<F>(
    fetcher: &F,
    manifest_url: &str,
    feedback: &mut impl ValidationFeedback,
) -> KensaResult<()>
where
    F: Fetcher,
{
    validate_manifest(fetcher, manifest_url, feedback).await?;
    Ok(())
}

/// Same as [`validate`], returning the manifest that was checked.
pub async fn validate_manifest<F>(
    fetcher: &F,
    manifest_url: &str,
    feedback: &mut impl ValidationFeedback,
) -> KensaResult<Manifest>
where
    F: Fetcher,
{
    let manifest_url = Url::parse(manifest_url)?;

    feedback.info(&format!("Downloading manifest from {manifest_url}"));
    let document = fetcher.fetch_text(&manifest_url).await?;
    let downloaded_at = Instant::now();
    feedback.downloaded_manifest(&document);

    let manifest = loader::load(&document, feedback)?;
    sanity::check(&manifest)?;

    let time_sync_url = manifest.time_sync_url.as_deref().ok_or_else(|| {
        KensaError::UnsupportedFeature(
            "manifest does not declare a supported clock synchronization method".to_string(),
        )
    })?;
    let time_sync_url = manifest_url.join(time_sync_url)?;

    let clock = Clock::sync(fetcher, &time_sync_url).await?;
    let now = clock.time_at(downloaded_at)?;
    feedback.info(&format!(
        "Synchronized clock: manifest downloaded at {}",
        format_timestamp(now)
    ));

    coverage::check(&manifest, now, feedback);
    Ok(manifest)
}
