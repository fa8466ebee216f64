use serde::{Deserialize, Serialize};

/// Optional device payload reported by the client alongside a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default)]
    pub is_jailbroken: bool,
    #[serde(default)]
    pub is_simulator: bool,
    #[serde(default)]
    pub debugger_attached: bool,
    /// Filesystem paths or URL schemes the client found present.
    #[serde(default)]
    pub suspicious_artifacts: Vec<String>,
    pub device_fingerprint: Option<String>,
    pub bundle_id: Option<String>,
}
