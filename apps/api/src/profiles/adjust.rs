use tracing::warn;

use crate::models::analysis::{AdjustedAnalysis, RawAnalysis};
use crate::profiles::ProfileStore;

/// Ceiling of the 1–10 rubric scale; boosted scores never exceed it.
pub const MAX_SCORE: f64 = 10.0;

/// Applies the named investor profile to a raw analysis.
///
/// Boosts multiply matching scores (clamped to [`MAX_SCORE`]), caps then bound
/// them, and the profile's red flags are merged in without duplicates.
///
/// An unknown profile name leaves scores and red flags untouched but still
/// records the requested name in `profile_applied`. Callers that must reject
/// unknown profiles check [`ProfileStore::get`] themselves.
pub fn adjust(raw: &RawAnalysis, profile_name: &str, store: &ProfileStore) -> AdjustedAnalysis {
    let mut analysis = raw.clone();
    analysis.extra.remove("profile_applied");

    let Some(profile) = store.get(profile_name) else {
        warn!("Profile '{profile_name}' not found, returning raw analysis");
        return AdjustedAnalysis {
            analysis,
            profile_applied: profile_name.to_string(),
        };
    };

    for (category, boost) in &profile.boosts {
        if let Some(score) = analysis.scores.get_mut(category) {
            *score = (*score * boost).min(MAX_SCORE);
        }
    }

    for (category, cap) in &profile.caps {
        if let Some(score) = analysis.scores.get_mut(category) {
            *score = score.min(*cap);
        }
    }

    analysis.red_flags.extend(profile.red_flags.iter().cloned());
    dedup_preserving_order(&mut analysis.red_flags);

    AdjustedAnalysis {
        analysis,
        profile_applied: profile_name.to_string(),
    }
}

fn dedup_preserving_order(flags: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    flags.retain(|f| seen.insert(f.clone()));
}
