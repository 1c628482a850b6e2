//! Run fingerprinting: deterministic identification of plans and event traces.
//!
//! - `PlanFingerprint`: exact identity of a validated exit plan.
//! - `TraceHash`: identity of a complete simulation event trace; equal seeds and
//!   inputs must produce equal trace hashes.
//! - `RunFingerprint`: compact record tying a call's inputs to its trace.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::plan::ValidatedPlan;

/// BLAKE3 over the canonical JSON of `value`.
///
/// Field order follows struct declaration order, so the encoding is stable
/// for a given build.
fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> String {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, value).expect("fingerprinted values must serialize");
    hasher.finalize().to_hex().to_string()
}

/// Exact identity of an exit plan (every field and parameter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanFingerprint(pub String);

impl fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ValidatedPlan {
    pub fn fingerprint(&self) -> PlanFingerprint {
        PlanFingerprint(canonical_hash(self.plan()))
    }
}

/// Hex-encoded BLAKE3 hash of a serialized event trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceHash(pub String);

impl TraceHash {
    pub fn of<T: Serialize>(events: &[T]) -> Self {
        Self(canonical_hash(events))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to reproduce one call simulation and check its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub call_id: String,
    pub seed: u64,
    pub plan: PlanFingerprint,
    pub execution_model: String,
    pub trace: TraceHash,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ExitPlan, LadderLeg};

    fn plan(target: f64) -> ValidatedPlan {
        ExitPlan {
            ladder: vec![LadderLeg {
                target,
                fraction: 0.5,
            }],
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn plan_fingerprint_is_stable() {
        assert_eq!(plan(2.0).fingerprint(), plan(2.0).fingerprint());
    }

    #[test]
    fn plan_fingerprint_tracks_parameters() {
        assert_ne!(plan(2.0).fingerprint(), plan(3.0).fingerprint());
    }

    #[test]
    fn trace_hash_is_hex_blake3() {
        let hash = TraceHash::of(&[1u32, 2, 3]);
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, TraceHash::of(&[1u32, 2, 3]));
        assert_ne!(hash, TraceHash::of(&[1u32, 3, 2]));
    }
}
