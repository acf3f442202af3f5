use crate::{
    model::{Manifest, TemplateOwner},
    KensaError, KensaResult,
};

/// Structural preconditions of the coverage check.
///
/// A manifest without periods, a period without adaptation sets or an adaptation set
/// without representations leaves nothing to analyse, so these are fatal.
pub fn check(manifest: &Manifest) -> KensaResult<()> {
    if manifest.first_period().is_none() {
        return Err(KensaError::UnsupportedFeature(
            "manifest contains no periods".to_string(),
        ));
    }

    for (period_id, period) in manifest.periods() {
        if period.adaptation_sets().is_empty() {
            return Err(KensaError::UnsupportedFeature(format!(
                "{} contains no adaptation sets",
                manifest.describe_period(period_id)
            )));
        }

        for set_id in period.adaptation_sets() {
            if manifest.adaptation_set(*set_id).representations().is_empty() {
                return Err(KensaError::UnsupportedFeature(format!(
                    "{} contains no representations",
                    manifest.describe_owner(TemplateOwner::AdaptationSet(*set_id))
                )));
            }
        }
    }

    Ok(())
}
