//! Canonical settings shape, normalization, and legacy migration.
//!
//! Stored data is untrusted: every value read from storage or received over the
//! message channel passes through [`normalize`], which never fails and repairs
//! each field independently.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::{Error, Result};

/// Storage key holding the canonical settings record.
pub const SETTINGS_KEY: &str = "nnPortfolioRefresherSettings";
/// Legacy storage key holding the enabled flag.
pub const LEGACY_ENABLED_KEY: &str = "nnPortfolioRefresherEnabled";
/// Legacy storage key holding the interval in seconds.
pub const LEGACY_INTERVAL_KEY: &str = "nnPortfolioRefresherIntervalSeconds";

/// Every key read by a settings load, in request order.
pub const LOAD_KEYS: [&str; 3] = [SETTINGS_KEY, LEGACY_ENABLED_KEY, LEGACY_INTERVAL_KEY];

/// Default for [`Settings::enabled`].
pub const DEFAULT_ENABLED: bool = true;
/// Default for [`Settings::interval_seconds`].
pub const DEFAULT_INTERVAL_SECONDS: u32 = 5;

/// Message shown when interval input is rejected locally.
pub const INTERVAL_INPUT_REJECTED: &str = "Please enter a positive number of seconds.";

/// Raw key/value view of a storage area.
pub type Snapshot = Map<String, Value>;

/// Normalized auto-refresh settings.
///
/// Values of this type always satisfy `interval_seconds >= 1`. Deserialization
/// goes through [`normalize`], so a malformed payload yields defaults for the
/// fields it cannot validate rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct Settings {
    /// Whether the periodic effector runs at all.
    enabled: bool,
    /// Seconds between effector invocations.
    interval_seconds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
        }
    }
}

impl From<Value> for Settings {
    fn from(raw: Value) -> Self {
        normalize(&raw)
    }
}

impl Settings {
    /// Construct settings; an interval of zero falls back to the default.
    pub fn new(enabled: bool, interval_seconds: u32) -> Self {
        Self {
            enabled,
            interval_seconds: if interval_seconds == 0 {
                DEFAULT_INTERVAL_SECONDS
            } else {
                interval_seconds
            },
        }
    }

    /// Whether the periodic effector should run.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Seconds between effector invocations (always at least 1).
    pub fn interval_seconds(&self) -> u32 {
        self.interval_seconds
    }

    /// Overlay `patch` on these settings and normalize the result.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self::new(
            patch.enabled.unwrap_or(self.enabled),
            patch.interval_seconds.unwrap_or(self.interval_seconds),
        )
    }

    /// JSON form of the canonical record.
    pub fn to_value(&self) -> Value {
        json!({
            "enabled": self.enabled,
            "intervalSeconds": self.interval_seconds,
        })
    }
}

/// A partial settings change produced by a user edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    /// New enabled flag, if changed.
    pub enabled: Option<bool>,
    /// New interval in seconds, if changed.
    pub interval_seconds: Option<u32>,
}

impl SettingsPatch {
    /// A patch touching only the enabled flag.
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    /// A patch touching only the interval.
    pub fn interval(seconds: u32) -> Self {
        Self {
            interval_seconds: Some(seconds),
            ..Self::default()
        }
    }
}

/// Result of deriving settings from a storage snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derived {
    /// Effective settings.
    pub settings: Settings,
    /// True when the canonical record is missing and should be written back.
    pub needs_persist: bool,
}

/// Numeric value of a string under loose web coercion rules.
///
/// Surrounding whitespace is ignored and an empty string is zero. Decimal and
/// exponent forms are accepted, as are unsigned `0x`, `0o` and `0b` integers.
fn loose_number(text: &str) -> Option<f64> {
    let s = text.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => {
            // Only plain decimal text; `f64::from_str` also takes "inf" and "nan".
            if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return None;
            }
            return s.parse::<f64>().ok();
        }
    };
    let digits = &s[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    Some(u128::from_str_radix(digits, radix).map_or(f64::MAX, |v| v as f64))
}

/// Coerce a raw value to a positive whole number of seconds.
///
/// Numbers, numeric strings, and `true` (as 1) are accepted when finite and
/// greater than zero; the result is floored, raised to at least 1, and
/// saturates at `u32::MAX`.
fn positive_seconds(raw: &Value) -> Option<u32> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => loose_number(s)?,
        Value::Bool(true) => 1.0,
        _ => return None,
    };
    if !n.is_finite() || n <= 0.0 {
        return None;
    }
    Some(n.floor().clamp(1.0, f64::from(u32::MAX)) as u32)
}

/// Normalize an arbitrary value into valid settings. Never fails.
pub fn normalize(raw: &Value) -> Settings {
    let mut settings = Settings::default();
    let Some(obj) = raw.as_object() else {
        return settings;
    };
    if let Some(enabled) = obj.get("enabled").and_then(Value::as_bool) {
        settings.enabled = enabled;
    }
    if let Some(secs) = obj.get("intervalSeconds").and_then(positive_seconds) {
        settings.interval_seconds = secs;
    }
    settings
}

/// Derive effective settings from a storage snapshot, migrating legacy keys.
pub fn derive_settings(snapshot: Option<&Snapshot>) -> Derived {
    let Some(data) = snapshot else {
        return Derived {
            settings: Settings::default(),
            needs_persist: true,
        };
    };

    // An array counts as a record; its fields are simply absent.
    if let Some(stored @ (Value::Object(_) | Value::Array(_))) = data.get(SETTINGS_KEY) {
        return Derived {
            settings: normalize(stored),
            needs_persist: false,
        };
    }

    let mut settings = Settings::default();
    if let Some(enabled) = data.get(LEGACY_ENABLED_KEY).and_then(Value::as_bool) {
        settings.enabled = enabled;
    }
    if let Some(secs) = data.get(LEGACY_INTERVAL_KEY).and_then(positive_seconds) {
        settings.interval_seconds = secs;
    }
    Derived {
        settings,
        needs_persist: true,
    }
}

/// Validate interval text typed by the user.
///
/// Parses a leading integer the way a lenient form field does: leading
/// whitespace and a sign are allowed and anything after the digits is ignored.
/// Non-numeric, zero, and negative input is rejected. Oversized input saturates.
pub fn parse_interval_input(input: &str) -> Result<u32> {
    let reject = || Error::ValidationRejected(INTERVAL_INPUT_REJECTED.to_string());
    let s = input.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() || negative {
        return Err(reject());
    }
    match digits.parse::<u32>() {
        Ok(0) => Err(reject()),
        Ok(v) => Ok(v),
        // Only overflow remains once the input is known to be all digits.
        Err(_) => Ok(u32::MAX),
    }
}
