//! $skip and $top ceilings

use super::error::{ValidationError, ValidationResult};
use crate::config::runtime::ValidationPreferences;
use crate::log_debug;
use crate::settings::ValidationSettings;

/// Fails only when a ceiling is configured and `value` is strictly above it
pub fn validate_skip(value: i64, settings: &ValidationSettings) -> ValidationResult<()> {
    validate_skip_with(value, settings, super::preferences())
}

/// Fails only when a ceiling is configured and `value` is strictly above it
pub fn validate_top(value: i64, settings: &ValidationSettings) -> ValidationResult<()> {
    validate_top_with(value, settings, super::preferences())
}

pub(crate) fn validate_skip_with(
    value: i64,
    settings: &ValidationSettings,
    preferences: &ValidationPreferences,
) -> ValidationResult<()> {
    match settings.max_skip {
        Some(max) if value > max => {
            Err(ValidationError::SkipExceedsMaximum { value, max }.report(preferences))
        }
        _ => {
            log_debug!("$skip within limits", "value" => value);
            Ok(())
        }
    }
}

pub(crate) fn validate_top_with(
    value: i64,
    settings: &ValidationSettings,
    preferences: &ValidationPreferences,
) -> ValidationResult<()> {
    match settings.max_top {
        Some(max) if value > max => {
            Err(ValidationError::TopExceedsMaximum { value, max }.report(preferences))
        }
        _ => {
            log_debug!("$top within limits", "value" => value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_no_ceiling_accepts_anything() {
        let settings = ValidationSettings::default();

        assert!(validate_skip(i64::MAX, &settings).is_ok());
        assert!(validate_top(i64::MAX, &settings).is_ok());
        assert!(validate_top(-1, &settings).is_ok());
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let settings = ValidationSettings::builder().max_top(100).max_skip(0).build();

        assert!(validate_top(100, &settings).is_ok());
        assert!(validate_skip(0, &settings).is_ok());

        assert_matches!(
            validate_top(101, &settings),
            Err(ValidationError::TopExceedsMaximum { value: 101, max: 100 })
        );
        assert_matches!(
            validate_skip(1, &settings),
            Err(ValidationError::SkipExceedsMaximum { value: 1, max: 0 })
        );
    }

    #[test]
    fn test_ceilings_are_independent() {
        let settings = ValidationSettings::builder().max_skip(10).build();

        assert!(validate_top(1_000_000, &settings).is_ok());
        assert!(validate_skip(11, &settings).is_err());
    }
}
