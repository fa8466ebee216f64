use serde::{Deserialize, Serialize};

/// Inputs for scoring one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FraudContext {
    /// Output of the device/receipt heuristics, in [0, 1].
    pub jailbreak_risk: f64,
    pub is_promotional: bool,
    pub transaction_id: Option<String>,
    pub product_id: Option<String>,
    pub device_fingerprint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    RefundHistory,
    JailbreakRisk,
    AccountAge,
    PromotionalAbuse,
    RefundCycling,
    Velocity,
    SharedDevice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudSignal {
    pub kind: SignalKind,
    /// Unclamped contribution to the total.
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    /// Always within [0, 100].
    pub score: u8,
    pub signals: Vec<FraudSignal>,
    pub flagged_for_review: bool,
}

impl FraudAssessment {
    pub fn points_for(&self, kind: SignalKind) -> f64 {
        self.signals
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.points)
            .sum()
    }
}
