//! Validation Utilities

use chrono::NaiveDate;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::error::{AppError, FieldError};
use super::snowflake::parse_id;

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut field_errors = Vec::new();
    collect_field_errors("", &errors, &mut field_errors);

    // HashMap iteration order is unstable; keep responses deterministic.
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    if field_errors.is_empty() {
        return AppError::Validation("Validation failed".into());
    }

    AppError::InvalidFields(field_errors)
}

/// Flatten nested struct and list errors into `profile.email`, `pets[0].name` paths.
fn collect_field_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldError {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Run `validator` rules on a request body.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(validation_error)
}

/// Validate an "HH:MM" 24-hour clock string.
pub fn validate_clock_time(value: &str) -> Result<(), validator::ValidationError> {
    match parse_clock_minutes(value) {
        Some(_) => Ok(()),
        None => Err(validator::ValidationError::new("clock_time")
            .with_message("Time must be in HH:MM format".into())),
    }
}

/// Single-field 400 error.
pub fn field_error(field: &str, message: impl Into<String>) -> AppError {
    AppError::InvalidFields(vec![FieldError {
        field: field.to_string(),
        message: message.into(),
    }])
}

/// Parse a required id field, reporting `missing` when absent or blank.
pub fn require_id(field: &str, value: Option<&str>, missing: &str) -> Result<i64, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Err(field_error(field, missing)),
        Some(raw) => parse_id(raw).ok_or_else(|| field_error(field, format!("Invalid {}", field))),
    }
}

/// Parse an optional id field; blank strings count as absent.
pub fn optional_id(field: &str, value: Option<&str>) -> Result<Option<i64>, AppError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_id(raw)
            .map(Some)
            .ok_or_else(|| field_error(field, format!("Invalid {}", field))),
    }
}

/// Parse "HH:MM" into minutes after midnight.
pub fn parse_clock_minutes(value: &str) -> Option<u32> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| field_error(field, "Date must be in YYYY-MM-DD format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
        password: String,
    }

    #[test]
    fn test_validation_error_collects_fields_sorted() {
        let sample = Sample {
            email: "nope".into(),
            password: "short".into(),
        };

        match validate_request(&sample).unwrap_err() {
            AppError::InvalidFields(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "email");
                assert_eq!(errors[0].message, "Invalid email format");
                assert_eq!(errors[1].field, "password");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let sample = Sample {
            email: "owner@petcare.test".into(),
            password: "long-enough".into(),
        };
        assert!(validate_request(&sample).is_ok());
    }

    #[test_case("09:00", Some(540) ; "morning")]
    #[test_case("00:00", Some(0) ; "midnight")]
    #[test_case("23:59", Some(1439) ; "last minute")]
    #[test_case("24:00", None ; "hour out of range")]
    #[test_case("9:00", None ; "missing leading zero")]
    #[test_case("09:60", None ; "minute out of range")]
    #[test_case("0900", None ; "no separator")]
    fn test_parse_clock_minutes(input: &str, expected: Option<u32>) {
        assert_eq!(parse_clock_minutes(input), expected);
    }

    #[test]
    fn test_require_id_messages() {
        match require_id("pet_id", None, "Please select a pet").unwrap_err() {
            AppError::InvalidFields(errors) => assert_eq!(errors[0].message, "Please select a pet"),
            other => panic!("unexpected error: {:?}", other),
        }
        match require_id("pet_id", Some("  "), "Please select a pet").unwrap_err() {
            AppError::InvalidFields(errors) => assert_eq!(errors[0].message, "Please select a pet"),
            other => panic!("unexpected error: {:?}", other),
        }
        match require_id("pet_id", Some("abc"), "Please select a pet").unwrap_err() {
            AppError::InvalidFields(errors) => assert_eq!(errors[0].message, "Invalid pet_id"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(require_id("pet_id", Some("42"), "x").unwrap(), 42);
    }

    #[test]
    fn test_optional_id() {
        assert_eq!(optional_id("staff_id", None).unwrap(), None);
        assert_eq!(optional_id("staff_id", Some("")).unwrap(), None);
        assert_eq!(optional_id("staff_id", Some("9")).unwrap(), Some(9));
        assert!(optional_id("staff_id", Some("-1")).is_err());
    }
}
