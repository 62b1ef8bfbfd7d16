//! Shared utilities for CLI commands.

use chrono::{DateTime, Utc};
use qs_core::{FilterPolicy, RawParams, resolve};

/// Surfaces the conditions that silently widen or empty the selection.
pub fn warn_about(raw: &RawParams, policy: &FilterPolicy, now: DateTime<Utc>) {
    match resolve(raw, policy, now) {
        Ok(spec) => {
            if let Some(ambiguity) = spec.ambiguity() {
                tracing::warn!(
                    given = ambiguity.given.param(),
                    value = %ambiguity.value,
                    missing = ambiguity.given.missing_param(),
                    "only one date bound given; no filters applied"
                );
            }
        }
        Err(err) => tracing::warn!(%err, "ignoring filters; selection is empty"),
    }
}
