//! Jailbreak/tamper heuristics over a receipt blob and the optional device
//! payload. Pure functions; every result is within [0, 1].

use base64::{prelude::BASE64_STANDARD, Engine as _};

use crate::domain::entities::device_info::DeviceInfo;

/// Risk at or above which a jailbreak signal is written to the audit trail.
pub const JAILBREAK_SIGNAL_THRESHOLD: f64 = 0.5;

/// Real receipts are several kilobytes of PKCS#7.
const MIN_PLAUSIBLE_RECEIPT_BYTES: usize = 64;

const KNOWN_JAILBREAK_ARTIFACTS: [&str; 9] = [
    "cydia",
    "sileo",
    "zebra",
    "mobilesubstrate",
    "substitute",
    "frida",
    "/bin/bash",
    "/usr/sbin/sshd",
    "/etc/apt",
];

/// Structural risk of the receipt blob itself.
pub fn receipt_risk(receipt_data: &str) -> f64 {
    let trimmed = receipt_data.trim();
    if trimmed.is_empty() {
        return 1.0;
    }
    match BASE64_STANDARD.decode(trimmed) {
        Err(_) => 0.4,
        Ok(bytes) if bytes.len() < MIN_PLAUSIBLE_RECEIPT_BYTES => 0.2,
        Ok(_) => 0.0,
    }
}

/// Risk derived from the client-reported device payload.
pub fn device_risk(device: &DeviceInfo, expected_bundle_id: &str) -> f64 {
    let mut risk = 0.0;
    if device.is_jailbroken {
        risk += 0.6;
    }
    if device.is_simulator {
        risk += 0.3;
    }
    if device.debugger_attached {
        risk += 0.3;
    }
    let artifacts = device
        .suspicious_artifacts
        .iter()
        .filter(|artifact| {
            let artifact = artifact.to_lowercase();
            KNOWN_JAILBREAK_ARTIFACTS
                .iter()
                .any(|known| artifact.contains(known))
        })
        .count();
    risk += 0.15 * artifacts as f64;
    if device
        .bundle_id
        .as_deref()
        .is_some_and(|bundle_id| bundle_id != expected_bundle_id)
    {
        // Re-signed or repackaged binary.
        risk += 0.5;
    }
    risk.min(1.0)
}

/// Combined jailbreak/tamper risk fed to the fraud scoring engine.
pub fn jailbreak_risk(
    receipt_data: &str,
    device: Option<&DeviceInfo>,
    expected_bundle_id: &str,
) -> f64 {
    let device = device
        .map(|d| device_risk(d, expected_bundle_id))
        .unwrap_or(0.0);
    (receipt_risk(receipt_data) + device).clamp(0.0, 1.0)
}
