//! Bonus inputs supplied by the seasonal/regional and challenge services

use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{BONUS_REFRESH_INTERVAL_SECS, BPS_DENOMINATOR, CHALLENGE_LIFETIME_SECS};

/// Session metric a challenge targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    /// Total repetitions
    Reps,
    /// Session length in seconds
    Duration,
    /// Best streak
    Streak,
    /// Average form accuracy
    Accuracy,
    /// Form-weighted repetitions: accuracy × reps / 100
    Combo,
}

impl ChallengeKind {
    /// Stable wire tag, also hashed into score receipts
    pub fn tag(&self) -> u8 {
        match self {
            Self::Reps => 0,
            Self::Duration => 1,
            Self::Streak => 2,
            Self::Accuracy => 3,
            Self::Combo => 4,
        }
    }
}

impl FromStr for ChallengeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reps" => Ok(Self::Reps),
            "duration" => Ok(Self::Duration),
            "streak" => Ok(Self::Streak),
            "accuracy" => Ok(Self::Accuracy),
            "combo" => Ok(Self::Combo),
            other => Err(format!("unknown challenge kind '{}'", other)),
        }
    }
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Reps => "reps",
            Self::Duration => "duration",
            Self::Streak => "streak",
            Self::Accuracy => "accuracy",
            Self::Combo => "combo",
        };
        write!(f, "{}", name)
    }
}

/// One time-boxed challenge instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSpec {
    /// Instance id; claims are tracked per (user, id)
    pub id: u64,
    pub kind: ChallengeKind,
    pub target: u64,
    /// Applied once when met, 10000 = ×1.0
    pub multiplier_bps: u32,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeSpec {
    /// Challenge issued at `issued_at` with the usual one-day lifetime
    pub fn daily(
        id: u64,
        kind: ChallengeKind,
        target: u64,
        multiplier_bps: u32,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            target,
            multiplier_bps,
            expires_at: issued_at + Duration::seconds(CHALLENGE_LIFETIME_SECS),
        }
    }

    /// Active strictly before expiry
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl FromStr for ChallengeSpec {
    type Err = String;

    /// `kind:target:multiplier_bps[:expiry_unix[:id]]`; an empty or missing
    /// expiry means one day from now
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if !(3..=5).contains(&parts.len()) {
            return Err(format!(
                "expected kind:target:multiplier_bps[:expiry_unix[:id]], got '{}'",
                s
            ));
        }
        let kind = parts[0].parse::<ChallengeKind>()?;
        let target = parts[1]
            .parse::<u64>()
            .map_err(|e| format!("bad target '{}': {}", parts[1], e))?;
        let multiplier_bps = parts[2]
            .parse::<u32>()
            .map_err(|e| format!("bad multiplier '{}': {}", parts[2], e))?;
        let expires_at = match parts.get(3).filter(|raw| !raw.is_empty()) {
            Some(raw) => {
                let expiry = raw
                    .parse::<i64>()
                    .map_err(|e| format!("bad expiry '{}': {}", raw, e))?;
                Utc.timestamp_opt(expiry, 0)
                    .single()
                    .ok_or_else(|| format!("expiry {} out of range", expiry))?
            }
            None => Utc::now() + Duration::seconds(CHALLENGE_LIFETIME_SECS),
        };
        let id = match parts.get(4) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("bad id '{}': {}", raw, e))?,
            None => 0,
        };
        Ok(Self {
            id,
            kind,
            target,
            multiplier_bps,
            expires_at,
        })
    }
}

/// External, read-only inputs to the composite scorer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusContext {
    #[serde(default)]
    pub seasonal_bonus_bps: u32,
    #[serde(default)]
    pub regional_bonus_bps: u32,
    #[serde(default)]
    pub challenge: Option<ChallengeSpec>,
    /// Whether this user already claimed `challenge`
    #[serde(default)]
    pub challenge_claimed: bool,
    /// When the bonus service last refreshed the bps values
    #[serde(default)]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl BonusContext {
    pub fn new(seasonal_bonus_bps: u32, regional_bonus_bps: u32) -> Self {
        Self {
            seasonal_bonus_bps,
            regional_bonus_bps,
            ..Self::default()
        }
    }

    pub fn with_challenge(mut self, challenge: ChallengeSpec, claimed: bool) -> Self {
        self.challenge = Some(challenge);
        self.challenge_claimed = claimed;
        self
    }

    /// 10000 + seasonal + regional
    pub fn weather_multiplier_bps(&self) -> u64 {
        BPS_DENOMINATOR + self.seasonal_bonus_bps as u64 + self.regional_bonus_bps as u64
    }

    /// Older than one refresh interval. Informational only.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.refreshed_at {
            Some(at) => now - at > Duration::seconds(BONUS_REFRESH_INTERVAL_SECS),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_challenge_spec() {
        let spec: ChallengeSpec = "streak:10:15000:1700000000:7".parse().unwrap();
        assert_eq!(spec.kind, ChallengeKind::Streak);
        assert_eq!(spec.target, 10);
        assert_eq!(spec.multiplier_bps, 15000);
        assert_eq!(spec.expires_at.timestamp(), 1_700_000_000);
        assert_eq!(spec.id, 7);
    }

    #[test]
    fn test_parse_challenge_rejects_unknown_kind() {
        assert!("plank:10:15000:1700000000".parse::<ChallengeSpec>().is_err());
        assert!("reps:10".parse::<ChallengeSpec>().is_err());
    }

    #[test]
    fn test_parse_challenge_without_expiry_lasts_a_day() {
        let spec: ChallengeSpec = "combo:40:12000".parse().unwrap();
        assert_eq!(spec.id, 0);
        assert!(spec.is_active(Utc::now() + Duration::hours(23)));
        assert!(!spec.is_active(Utc::now() + Duration::hours(25)));
    }

    #[test]
    fn test_daily_challenge_expiry() {
        let issued = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let spec = ChallengeSpec::daily(3, ChallengeKind::Reps, 50, 15000, issued);
        assert_eq!(spec.expires_at.timestamp(), 1_700_086_400);
    }

    #[test]
    fn test_challenge_expires_at_boundary() {
        let spec: ChallengeSpec = "reps:10:12000:1000".parse().unwrap();
        let before = Utc.timestamp_opt(999, 0).unwrap();
        let at = Utc.timestamp_opt(1000, 0).unwrap();
        assert!(spec.is_active(before));
        assert!(!spec.is_active(at));
    }

    #[test]
    fn test_weather_multiplier() {
        let ctx = BonusContext::new(1000, 500);
        assert_eq!(ctx.weather_multiplier_bps(), 11_500);
    }

    #[test]
    fn test_staleness() {
        let now = Utc.timestamp_opt(100_000, 0).unwrap();
        let mut ctx = BonusContext::new(0, 0);
        assert!(ctx.is_stale(now));
        ctx.refreshed_at = Some(now - Duration::hours(5));
        assert!(!ctx.is_stale(now));
        ctx.refreshed_at = Some(now - Duration::hours(7));
        assert!(ctx.is_stale(now));
    }
}
