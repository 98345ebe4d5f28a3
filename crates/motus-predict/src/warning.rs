//! Predictive warnings and their registry
//!
//! Warning ids combine the angle, the crossing kind and a coarse time
//! bucket, so re-evaluating the same condition on the next frame yields
//! the same id. The registry additionally enforces a per (angle, kind)
//! hysteresis window and drops warnings once they expire.

use std::fmt;

use motus_core::{AngleId, FrameTime};
use serde::Serialize;
use tracing::debug;

use crate::{CrossingDirection, MessageCatalog, ThresholdCrossing, ThresholdKind};

/// How soon the user needs to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Error crossings and imminent ones are high; then medium; else low
    pub fn classify(kind: ThresholdKind, time_to_issue_ms: f64, high_ms: f64, medium_ms: f64) -> Self {
        if kind == ThresholdKind::Error || time_to_issue_ms < high_ms {
            Urgency::High
        } else if time_to_issue_ms < medium_ms {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

/// Deterministic warning key: angle, crossing kind and time bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct WarningId {
    pub angle: AngleId,
    pub kind: ThresholdKind,
    pub bucket: i64,
}

impl WarningId {
    pub fn new(angle: AngleId, kind: ThresholdKind, timestamp: FrameTime, bucket_ms: u32) -> Self {
        Self {
            angle,
            kind,
            bucket: timestamp.as_millis().div_euclid(bucket_ms.max(1) as i64),
        }
    }
}

impl fmt::Display for WarningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.angle, self.kind, self.bucket)
    }
}

/// A warning raised ahead of a predicted range exit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictiveWarning {
    pub id: WarningId,
    pub angle: AngleId,
    pub direction: CrossingDirection,
    pub message: String,
    pub correction: String,
    pub urgency: Urgency,
    pub time_to_issue_ms: f64,
    pub confidence: f64,
    pub created_at: FrameTime,
    pub expires_at: FrameTime,
}

impl PredictiveWarning {
    pub fn is_expired(&self, now: FrameTime) -> bool {
        now >= self.expires_at
    }
}

/// Registry timing parameters
#[derive(Debug, Clone, Copy)]
pub struct WarningPolicy {
    pub hysteresis_ms: u32,
    pub ttl_ms: u32,
    pub bucket_ms: u32,
    pub urgency_high_ms: f64,
    pub urgency_medium_ms: f64,
}

/// Active-set of emitted warnings
#[derive(Debug, Clone)]
pub struct WarningRegistry {
    policy: WarningPolicy,
    active: Vec<PredictiveWarning>,
    /// Last emission per angle and kind
    last_emitted: [[Option<FrameTime>; 2]; AngleId::COUNT],
}

impl WarningRegistry {
    pub fn new(policy: WarningPolicy) -> Self {
        Self {
            policy,
            active: Vec::new(),
            last_emitted: [[None; 2]; AngleId::COUNT],
        }
    }

    /// Drop warnings whose lifetime has ended
    pub fn expire(&mut self, now: FrameTime) {
        self.active.retain(|warning| {
            let keep = !warning.is_expired(now);
            if !keep {
                debug!(id = %warning.id, "warning expired");
            }
            keep
        });
    }

    /// Turn a crossing into a warning unless it duplicates an active one or
    /// falls inside the hysteresis window. Returns the new warning.
    pub fn offer(
        &mut self,
        crossing: &ThresholdCrossing,
        now: FrameTime,
        catalog: &MessageCatalog,
    ) -> Option<PredictiveWarning> {
        let id = WarningId::new(crossing.angle, crossing.kind, now, self.policy.bucket_ms);

        if self.active.iter().any(|w| w.id == id) {
            return None;
        }

        let slot = &mut self.last_emitted[crossing.angle.index()][crossing.kind.index()];
        if let Some(last) = *slot {
            if now.millis_since(last) < self.policy.hysteresis_ms as f64 {
                return None;
            }
        }
        *slot = Some(now);

        let text = catalog.lookup(crossing.angle.group(), crossing.direction);
        let warning = PredictiveWarning {
            id,
            angle: crossing.angle,
            direction: crossing.direction,
            message: text.message.into_owned(),
            correction: text.correction.into_owned(),
            urgency: Urgency::classify(
                crossing.kind,
                crossing.time_to_threshold_ms,
                self.policy.urgency_high_ms,
                self.policy.urgency_medium_ms,
            ),
            time_to_issue_ms: crossing.time_to_threshold_ms,
            confidence: crossing.confidence,
            created_at: now,
            expires_at: FrameTime::from_micros(
                now.as_micros() + self.policy.ttl_ms as i64 * 1000,
            ),
        };

        debug!(
            id = %warning.id,
            urgency = ?warning.urgency,
            time_to_issue_ms = warning.time_to_issue_ms,
            "predictive warning emitted"
        );

        self.active.push(warning.clone());
        Some(warning)
    }

    pub fn active(&self) -> &[PredictiveWarning] {
        &self.active
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.last_emitted = [[None; 2]; AngleId::COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RiskLevel;

    fn policy() -> WarningPolicy {
        WarningPolicy {
            hysteresis_ms: 1000,
            ttl_ms: 1000,
            bucket_ms: 500,
            urgency_high_ms: 150.0,
            urgency_medium_ms: 250.0,
        }
    }

    fn crossing(kind: ThresholdKind, ttt: f64) -> ThresholdCrossing {
        ThresholdCrossing {
            angle: AngleId::RightHip,
            direction: CrossingDirection::BelowMin,
            current_value: 55.0,
            predicted_value: 45.0,
            kind,
            threshold_value: 50.0,
            time_to_threshold_ms: ttt,
            confidence: 0.8,
            risk_level: RiskLevel::from(kind),
        }
    }

    #[test]
    fn test_id_format() {
        let id = WarningId::new(
            AngleId::LeftKnee,
            ThresholdKind::Warning,
            FrameTime::from_millis(1234),
            500,
        );
        assert_eq!(id.to_string(), "left_knee_warning_2");
    }

    #[test]
    fn test_urgency() {
        assert_eq!(Urgency::classify(ThresholdKind::Error, 900.0, 150.0, 250.0), Urgency::High);
        assert_eq!(Urgency::classify(ThresholdKind::Warning, 100.0, 150.0, 250.0), Urgency::High);
        assert_eq!(Urgency::classify(ThresholdKind::Warning, 200.0, 150.0, 250.0), Urgency::Medium);
        assert_eq!(
            Urgency::classify(ThresholdKind::Warning, f64::INFINITY, 150.0, 250.0),
            Urgency::Low
        );
    }

    #[test]
    fn test_hysteresis_and_expiry() {
        let mut registry = WarningRegistry::new(policy());
        let catalog = MessageCatalog::new();
        let c = crossing(ThresholdKind::Warning, 200.0);

        let first = registry.offer(&c, FrameTime::from_millis(100), &catalog);
        assert!(first.is_some());
        assert_eq!(first.unwrap().urgency, Urgency::Medium);

        // Same bucket, and a later bucket inside the hysteresis window
        assert!(registry.offer(&c, FrameTime::from_millis(200), &catalog).is_none());
        assert!(registry.offer(&c, FrameTime::from_millis(700), &catalog).is_none());

        // Other kinds are independent
        let e = crossing(ThresholdKind::Error, 200.0);
        assert!(registry.offer(&e, FrameTime::from_millis(700), &catalog).is_some());
        assert_eq!(registry.active().len(), 2);

        registry.expire(FrameTime::from_millis(1100));
        assert_eq!(registry.active().len(), 1);

        let again = registry.offer(&c, FrameTime::from_millis(1150), &catalog);
        assert!(again.is_some());
    }

    #[test]
    fn test_clear() {
        let mut registry = WarningRegistry::new(policy());
        let catalog = MessageCatalog::new();
        let c = crossing(ThresholdKind::Warning, 50.0);
        registry.offer(&c, FrameTime::from_millis(0), &catalog);
        registry.clear();

        assert!(registry.active().is_empty());
        assert!(registry.offer(&c, FrameTime::from_millis(10), &catalog).is_some());
    }
}
