//! Gate configuration and validation.

use std::time::Duration;

use crate::domain::policy::Policy;

/// Error returned when a gate configuration is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// At least one admission per window is required.
    #[error("request limit must be greater than 0")]
    ZeroRequestLimit,

    /// The window must have a positive length.
    #[error("window duration must be greater than 0")]
    ZeroWindow,

    /// A serialized config named both or neither of `window_ms` and `window_unit`.
    #[error("exactly one of `window_ms` or `window_unit` must be set")]
    AmbiguousWindow,
}

pub(crate) fn validate(request_limit: u32, window: Duration) -> Result<(), ConfigError> {
    if request_limit == 0 {
        return Err(ConfigError::ZeroRequestLimit);
    }
    if window.is_zero() {
        return Err(ConfigError::ZeroWindow);
    }
    Ok(())
}

/// How admissions are counted against the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum WindowMode {
    /// Count from a moving reset point; reset once the window has elapsed.
    #[default]
    Fixed,
    /// Keep a log of admission instants; bounds every interval of the window length.
    Sliding,
}

/// A window of exactly one unit of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum WindowUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl WindowUnit {
    /// Length of one unit.
    pub const fn as_duration(self) -> Duration {
        match self {
            WindowUnit::Milliseconds => Duration::from_millis(1),
            WindowUnit::Seconds => Duration::from_secs(1),
            WindowUnit::Minutes => Duration::from_secs(60),
            WindowUnit::Hours => Duration::from_secs(60 * 60),
            WindowUnit::Days => Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl From<WindowUnit> for Duration {
    fn from(unit: WindowUnit) -> Self {
        unit.as_duration()
    }
}

/// Validated gate configuration.
///
/// A `GateConfig` can only be obtained through a validating constructor, so
/// holding one means the limit and window are both positive.
///
/// # Example
/// ```
/// use rate_gate::{GateConfig, WindowMode, WindowUnit};
/// use std::time::Duration;
///
/// let config = GateConfig::per_unit(WindowUnit::Seconds, 6)
///     .unwrap()
///     .with_mode(WindowMode::Sliding);
/// assert_eq!(config.window(), Duration::from_secs(1));
/// assert_eq!(config.request_limit(), 6);
///
/// assert!(GateConfig::new(Duration::from_secs(1), 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawGateConfig", into = "RawGateConfig")
)]
pub struct GateConfig {
    request_limit: u32,
    window: Duration,
    mode: WindowMode,
}

impl GateConfig {
    /// Allow `request_limit` admissions per `window`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if either value is zero.
    pub fn new(window: Duration, request_limit: u32) -> Result<Self, ConfigError> {
        validate(request_limit, window)?;
        Ok(Self {
            request_limit,
            window,
            mode: WindowMode::default(),
        })
    }

    /// Allow `request_limit` admissions per one `unit` of time.
    ///
    /// # Errors
    /// Returns [`ConfigError::ZeroRequestLimit`] if `request_limit` is zero.
    pub fn per_unit(unit: WindowUnit, request_limit: u32) -> Result<Self, ConfigError> {
        Self::new(unit.as_duration(), request_limit)
    }

    /// Select how admissions are counted.
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn request_limit(&self) -> u32 {
        self.request_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    /// Build the admission policy described by this config.
    pub fn policy(&self) -> Policy {
        Policy::unchecked(self.mode, self.request_limit, self.window)
    }
}

/// Wire form of [`GateConfig`].
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGateConfig {
    request_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_unit: Option<WindowUnit>,
    #[serde(default)]
    mode: WindowMode,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGateConfig> for GateConfig {
    type Error = ConfigError;

    fn try_from(raw: RawGateConfig) -> Result<Self, Self::Error> {
        let window = match (raw.window_ms, raw.window_unit) {
            (Some(ms), None) => Duration::from_millis(ms),
            (None, Some(unit)) => unit.as_duration(),
            _ => return Err(ConfigError::AmbiguousWindow),
        };
        Ok(GateConfig::new(window, raw.request_limit)?.with_mode(raw.mode))
    }
}

#[cfg(feature = "serde")]
impl From<GateConfig> for RawGateConfig {
    fn from(config: GateConfig) -> Self {
        Self {
            request_limit: config.request_limit,
            window_ms: Some(u64::try_from(config.window.as_millis()).unwrap_or(u64::MAX)),
            window_unit: None,
            mode: config.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::policy::AdmissionPolicy;

    #[test]
    fn test_zero_request_limit_rejected() {
        assert_eq!(
            GateConfig::new(Duration::from_secs(1), 0),
            Err(ConfigError::ZeroRequestLimit)
        );
    }

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(
            GateConfig::new(Duration::ZERO, 5),
            Err(ConfigError::ZeroWindow)
        );
    }

    #[test]
    fn test_per_unit() {
        let config = GateConfig::per_unit(WindowUnit::Minutes, 100).unwrap();
        assert_eq!(config.window(), Duration::from_secs(60));
        assert_eq!(config.request_limit(), 100);
        assert_eq!(config.mode(), WindowMode::Fixed);

        assert_eq!(
            Duration::from(WindowUnit::Milliseconds),
            Duration::from_millis(1)
        );
        assert_eq!(WindowUnit::Days.as_duration(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_policy_follows_mode() {
        let config = GateConfig::new(Duration::from_millis(250), 3)
            .unwrap()
            .with_mode(WindowMode::Sliding);
        let policy = config.policy();

        assert_eq!(policy.mode(), WindowMode::Sliding);
        assert_eq!(policy.limit(), 3);
        assert_eq!(policy.window(), Duration::from_millis(250));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::ZeroRequestLimit.to_string(),
            "request limit must be greater than 0"
        );
        assert_eq!(
            ConfigError::ZeroWindow.to_string(),
            "window duration must be greater than 0"
        );
    }

    #[cfg(feature = "serde")]
    mod serde_config {
        use super::*;

        #[test]
        fn test_deserialize_window_ms() {
            let config: GateConfig =
                serde_json::from_str(r#"{"request_limit": 6, "window_ms": 1000}"#).unwrap();
            assert_eq!(config, GateConfig::new(Duration::from_secs(1), 6).unwrap());
        }

        #[test]
        fn test_deserialize_window_unit_and_mode() {
            let config: GateConfig = serde_json::from_str(
                r#"{"request_limit": 10, "window_unit": "minutes", "mode": "sliding"}"#,
            )
            .unwrap();
            assert_eq!(config.window(), Duration::from_secs(60));
            assert_eq!(config.mode(), WindowMode::Sliding);
        }

        #[test]
        fn test_deserialize_validates() {
            let err = serde_json::from_str::<GateConfig>(r#"{"request_limit": 0, "window_ms": 10}"#)
                .unwrap_err();
            assert!(err.to_string().contains("request limit must be greater than 0"));

            let err = serde_json::from_str::<GateConfig>(
                r#"{"request_limit": 1, "window_ms": 10, "window_unit": "seconds"}"#,
            )
            .unwrap_err();
            assert!(err.to_string().contains("exactly one of"));
        }

        #[test]
        fn test_serialize_uses_millis() {
            let config = GateConfig::per_unit(WindowUnit::Seconds, 6).unwrap();
            let json = serde_json::to_value(config).unwrap();
            assert_eq!(
                json,
                serde_json::json!({"request_limit": 6, "window_ms": 1000, "mode": "fixed"})
            );
        }
    }
}
