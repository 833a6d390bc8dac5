//! Composite score results and receipts
//!
//! A receipt is the SHA-256 of a fixed big-endian encoding of every scoring
//! input plus the result. Client estimate and ledger recomputation agree
//! exactly when their receipts match.

use serde::{Deserialize, Serialize};

/// Session figures the composite score reads. Implemented by the client's
/// finalized summary and by the record the ledger receives, so both sides run
/// the same arithmetic.
pub trait ScoreInputs {
    fn reps(&self) -> u32;
    fn average_form_accuracy(&self) -> u8;
    fn best_streak(&self) -> u32;
    fn duration_secs(&self) -> u64;
}

/// Step-by-step result of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Volume + form + streak + duration points
    pub base: u64,
    /// 10000 + seasonal + regional
    pub weather_multiplier_bps: u64,
    /// base × weather multiplier / 10000
    pub after_bonus: u64,
    /// Challenge target reached (regardless of claim status)
    pub challenge_met: bool,
    /// Challenge multiplier applied; the caller records the claim
    pub challenge_applied: bool,
    pub final_score: u64,
}

/// Canonical payload hashed into a receipt (66 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorePayload {
    pub version: u16,
    pub reps: u32,
    pub average_form_accuracy: u8,
    pub best_streak: u32,
    pub duration_secs: u64,
    pub seasonal_bonus_bps: u32,
    pub regional_bonus_bps: u32,
    pub challenge_present: bool,
    pub challenge_id: u64,
    pub challenge_kind: u8,
    pub challenge_target: u64,
    pub challenge_multiplier_bps: u32,
    pub challenge_expiry_unix: i64,
    pub challenge_applied: bool,
    pub final_score: u64,
}

impl ScorePayload {
    pub const SIZE: usize = 66;

    /// Serialize to fixed-size big-endian bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let mut offset = 0;

        let mut put = |chunk: &[u8]| {
            bytes[offset..offset + chunk.len()].copy_from_slice(chunk);
            offset += chunk.len();
        };

        put(&self.version.to_be_bytes());
        put(&self.reps.to_be_bytes());
        put(&[self.average_form_accuracy]);
        put(&self.best_streak.to_be_bytes());
        put(&self.duration_secs.to_be_bytes());
        put(&self.seasonal_bonus_bps.to_be_bytes());
        put(&self.regional_bonus_bps.to_be_bytes());
        put(&[self.challenge_present as u8]);
        put(&self.challenge_id.to_be_bytes());
        put(&[self.challenge_kind]);
        put(&self.challenge_target.to_be_bytes());
        put(&self.challenge_multiplier_bps.to_be_bytes());
        put(&self.challenge_expiry_unix.to_be_bytes());
        put(&[self.challenge_applied as u8]);
        put(&self.final_score.to_be_bytes());

        bytes
    }
}

/// Score plus digest of the inputs that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReceipt {
    pub score: u64,
    pub digest: [u8; 32],
}

impl ScoreReceipt {
    pub fn to_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ScorePayload {
        ScorePayload {
            version: 1,
            reps: 50,
            average_form_accuracy: 90,
            best_streak: 10,
            duration_secs: 120,
            seasonal_bonus_bps: 1000,
            regional_bonus_bps: 500,
            challenge_present: false,
            challenge_id: 0,
            challenge_kind: 0,
            challenge_target: 0,
            challenge_multiplier_bps: 0,
            challenge_expiry_unix: 0,
            challenge_applied: false,
            final_score: 238,
        }
    }

    #[test]
    fn test_payload_layout() {
        let bytes = payload().to_bytes();
        assert_eq!(&bytes[0..2], &[0, 1]);
        assert_eq!(&bytes[2..6], &50u32.to_be_bytes());
        assert_eq!(bytes[6], 90);
        assert_eq!(&bytes[58..66], &238u64.to_be_bytes());
    }

    #[test]
    fn test_payload_differs_on_any_field() {
        let a = payload().to_bytes();
        let mut p = payload();
        p.regional_bonus_bps = 501;
        assert_ne!(a, p.to_bytes());
    }
}
