use crate::flags::{Feature, FeatureFlags};
use chrono::{DateTime, Utc};
use model::execution::result::EngineKind;
use serde::Serialize;

/// Seconds per rollout time bucket. Ids derived within the same hour match.
pub const TIME_BUCKET_SECS: i64 = 3600;

pub fn time_bucket(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(TIME_BUCKET_SECS)
}

/// Stable id for a submitted step set: independent of submission order,
/// salted by the time bucket.
pub fn derive_execution_id<S: AsRef<str>>(step_ids: &[S], bucket: i64) -> String {
    let mut ids: Vec<&str> = step_ids.iter().map(AsRef::as_ref).collect();
    ids.sort_unstable();

    let mut h = blake3::Hasher::new();
    for id in ids {
        h.update(id.as_bytes());
        h.update(b"\0");
    }
    h.update(b":");
    h.update(bucket.to_string().as_bytes());
    format!("exec-{}", &h.finalize().to_hex()[..16])
}

/// Maps an execution id onto `[0, 100)`.
pub fn rollout_bucket(execution_id: &str) -> u8 {
    let hash = blake3::hash(execution_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    (u64::from_be_bytes(prefix) % 100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutReason {
    ForcedLegacy,
    ForcedNext,
    NextDisabled,
    FullRollout,
    InsideRollout,
    OutsideRollout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RolloutDecision {
    pub engine: EngineKind,
    pub reason: RolloutReason,
    /// Hash bucket, present only when gradual rollout decided.
    pub bucket: Option<u8>,
}

/// Pure routing decision for one execution id under one flag snapshot.
pub fn decide(execution_id: &str, flags: &FeatureFlags) -> RolloutDecision {
    let fixed = |engine, reason| RolloutDecision {
        engine,
        reason,
        bucket: None,
    };

    if flags.is_enabled(Feature::ForceLegacy) {
        return fixed(EngineKind::Legacy, RolloutReason::ForcedLegacy);
    }
    if flags.is_enabled(Feature::ForceNext) {
        return fixed(EngineKind::Next, RolloutReason::ForcedNext);
    }
    if !flags.is_enabled(Feature::NextEngine) {
        return fixed(EngineKind::Legacy, RolloutReason::NextDisabled);
    }
    if !flags.is_enabled(Feature::GradualRollout) {
        return fixed(EngineKind::Next, RolloutReason::FullRollout);
    }

    let bucket = rollout_bucket(execution_id);
    let (engine, reason) = if bucket < flags.rollout_percentage() {
        (EngineKind::Next, RolloutReason::InsideRollout)
    } else {
        (EngineKind::Legacy, RolloutReason::OutsideRollout)
    };
    RolloutDecision {
        engine,
        reason,
        bucket: Some(bucket),
    }
}

pub fn should_use_next(execution_id: &str, flags: &FeatureFlags) -> bool {
    decide(execution_id, flags).engine == EngineKind::Next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn gradual(pct: i64) -> FeatureFlags {
        FeatureFlags::default()
            .with_feature(Feature::NextEngine, true)
            .with_feature(Feature::GradualRollout, true)
            .with_rollout_percentage(pct)
            .unwrap()
    }

    #[test]
    fn execution_id_ignores_submission_order() {
        let a = derive_execution_id(&["load_b", "load_a", "t1"], 7);
        let b = derive_execution_id(&["t1", "load_a", "load_b"], 7);
        assert_eq!(a, b);
        assert!(a.starts_with("exec-"));
        assert_eq!(a.len(), "exec-".len() + 16);
        assert_ne!(a, derive_execution_id(&["t1", "load_a", "load_b"], 8));
    }

    #[test]
    fn time_bucket_is_hourly() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 59, 59).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert_eq!(time_bucket(t0), time_bucket(t1));
        assert_ne!(time_bucket(t1), time_bucket(t2));
    }

    #[test]
    fn decision_is_deterministic() {
        let flags = gradual(50);
        for i in 0..50 {
            let id = format!("exec-{i}");
            assert_eq!(decide(&id, &flags), decide(&id, &flags));
        }
    }

    #[test]
    fn boundary_percentages() {
        let none = gradual(0);
        let all = gradual(100);
        for i in 0..200 {
            let id = format!("exec-{i}");
            assert!(!should_use_next(&id, &none));
            assert!(should_use_next(&id, &all));
        }
    }

    #[test]
    fn intermediate_rate_is_close_to_configured() {
        let flags = gradual(30);
        let hits = (0..1000)
            .filter(|i| should_use_next(&format!("run-{i}"), &flags))
            .count();
        assert!((200..=400).contains(&hits), "observed {hits} of 1000");
    }

    #[test]
    fn forced_flags_override_rollout() {
        let legacy = gradual(100).with_feature(Feature::ForceLegacy, true);
        assert_eq!(decide("x", &legacy).reason, RolloutReason::ForcedLegacy);

        let next = FeatureFlags::default().with_feature(Feature::ForceNext, true);
        assert_eq!(decide("x", &next).engine, EngineKind::Next);
    }

    #[test]
    fn next_without_gradual_is_full_rollout() {
        let flags = FeatureFlags::default().with_feature(Feature::NextEngine, true);
        let decision = decide("anything", &flags);
        assert_eq!(decision.engine, EngineKind::Next);
        assert_eq!(decision.bucket, None);
    }
}
