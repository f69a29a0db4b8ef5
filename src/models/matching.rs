use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    Excellent,
    Good,
    Fair,
    Possible,
}

impl MatchReason {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            MatchReason::Excellent
        } else if score >= 60.0 {
            MatchReason::Good
        } else if score >= 40.0 {
            MatchReason::Fair
        } else {
            MatchReason::Possible
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Scored,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub route_similarity: f64,
    pub timing_score: f64,
    pub distance_score: f64,
    pub detour_cost_score: f64,
    pub detour_km: f64,
    pub pickup_distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub ride_id: Uuid,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub reason: MatchReason,
    pub kind: MatchKind,
}

#[cfg(test)]
mod tests {
    use super::MatchReason;

    #[test]
    fn reason_thresholds_are_inclusive() {
        assert_eq!(MatchReason::from_score(100.0), MatchReason::Excellent);
        assert_eq!(MatchReason::from_score(80.0), MatchReason::Excellent);
        assert_eq!(MatchReason::from_score(79.99), MatchReason::Good);
        assert_eq!(MatchReason::from_score(60.0), MatchReason::Good);
        assert_eq!(MatchReason::from_score(40.0), MatchReason::Fair);
        assert_eq!(MatchReason::from_score(39.9), MatchReason::Possible);
        assert_eq!(MatchReason::from_score(0.0), MatchReason::Possible);
    }
}
