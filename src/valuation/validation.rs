//! Request validation. Everything the estimator receives has passed through here:
//! required fields present, numbers coerced to integers, condition known.

use serde::Deserialize;
use validator::{Validate, ValidateEmail};

use crate::config::MIN_VEHICLE_YEAR;
use crate::error::{AppError, Result};
use crate::types::{Condition, NewInquiry, NewUser, VehicleDescriptor};

/// A JSON number or a numeric string; web forms send either.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    /// Integral value, if there is one. `"85000"`, `85000` and `85000.0` all qualify.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Numeric::Int(n) => Some(*n),
            Numeric::Float(f) => float_to_int(*f),
            Numeric::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_to_int))
            }
        }
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Raw vehicle fields as they arrive on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<Numeric>,
    pub mileage: Option<Numeric>,
    pub condition: Option<String>,
    pub vin: Option<String>,
}

impl VehicleRequest {
    /// Collects every problem before rejecting so the client can fix them in one pass.
    pub fn validate(&self, current_year: i32) -> Result<VehicleDescriptor> {
        let mut problems = Vec::new();

        let make = required_text("make", self.make.as_deref(), &mut problems);
        let model = required_text("model", self.model.as_deref(), &mut problems);

        let year = match self.year.as_ref().map(Numeric::as_integer) {
            None => {
                problems.push("year is required".to_string());
                None
            }
            Some(None) => {
                problems.push("year must be a whole number".to_string());
                None
            }
            Some(Some(y)) if y < i64::from(MIN_VEHICLE_YEAR) || y > i64::from(current_year) + 1 => {
                problems.push(format!(
                    "year must be between {MIN_VEHICLE_YEAR} and {}",
                    current_year + 1
                ));
                None
            }
            Some(Some(y)) => i32::try_from(y).ok(),
        };

        let mileage = match self.mileage.as_ref().map(Numeric::as_integer) {
            None => {
                problems.push("mileage is required".to_string());
                None
            }
            Some(None) => {
                problems.push("mileage must be a whole number".to_string());
                None
            }
            Some(Some(m)) if m < 0 => {
                problems.push("mileage must not be negative".to_string());
                None
            }
            Some(Some(m)) => match u32::try_from(m) {
                Ok(m) => Some(m),
                Err(_) => {
                    problems.push("mileage is out of range".to_string());
                    None
                }
            },
        };

        let condition = match self.condition.as_deref().map(str::trim) {
            None | Some("") => {
                problems.push("condition is required".to_string());
                None
            }
            Some(c) => match c.to_lowercase().parse::<Condition>() {
                Ok(c) => Some(c),
                Err(_) => {
                    let allowed: Vec<&str> = Condition::ALL.iter().map(|c| c.as_str()).collect();
                    problems.push(format!(
                        "condition must be one of: {}",
                        allowed.join(", ")
                    ));
                    None
                }
            },
        };

        let vin = optional_text(self.vin.as_deref());

        match (make, model, year, mileage, condition) {
            (Some(make), Some(model), Some(year), Some(mileage), Some(condition))
                if problems.is_empty() =>
            {
                Ok(VehicleDescriptor { make, model, year, mileage, condition, vin })
            }
            _ => Err(AppError::Validation(problems.join("; "))),
        }
    }
}

/// Raw contact-form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InquiryRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

impl InquiryRequest {
    pub fn validate(&self) -> Result<NewInquiry> {
        let mut problems = Vec::new();

        let name = required_text("name", self.name.as_deref(), &mut problems);
        let message = required_text("message", self.message.as_deref(), &mut problems);
        let email = match self.email.as_deref().map(str::trim) {
            Some(e) if is_plausible_email(e) => Some(e.to_string()),
            _ => {
                problems.push("a valid email is required".to_string());
                None
            }
        };
        let phone = optional_text(self.phone.as_deref());

        match (name, email, message) {
            (Some(name), Some(email), Some(message)) if problems.is_empty() => {
                Ok(NewInquiry { name, email, phone, message })
            }
            _ => Err(AppError::Validation(problems.join("; "))),
        }
    }
}

/// Self-registration. Only profile fields; credentials are not accepted here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(max = 100, message = "firstName is too long"))]
    pub first_name: Option<String>,
    #[validate(length(max = 100, message = "lastName is too long"))]
    pub last_name: Option<String>,
}

impl RegisterRequest {
    /// Trims every field, drops blank names, then runs the declared rules.
    pub fn into_new_user(self) -> Result<NewUser> {
        let trimmed = RegisterRequest {
            email: self.email.trim().to_string(),
            first_name: optional_text(self.first_name.as_deref()),
            last_name: optional_text(self.last_name.as_deref()),
        };
        trimmed
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(NewUser {
            email: trimmed.email,
            first_name: trimmed.first_name,
            last_name: trimmed.last_name,
        })
    }
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn required_text(field: &str, value: Option<&str>, problems: &mut Vec<String>) -> Option<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            problems.push(format!("{field} is required"));
            None
        }
    }
}

/// Syntax check only (HTML5 rules via `validator`). Deliverability is not checked.
pub fn is_plausible_email(email: &str) -> bool {
    email.validate_email()
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i32 = 2025;

    fn request(body: serde_json::Value) -> VehicleRequest {
        serde_json::from_value(body).unwrap()
    }

    fn problems(req: &VehicleRequest) -> String {
        match req.validate(YEAR) {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let v = request(serde_json::json!({
            "make": " Audi ", "model": "A4", "year": "2018", "mileage": 95000.0,
            "condition": "very-good", "vin": "WAUZZZ8K7JA123456"
        }))
        .validate(YEAR)
        .unwrap();
        assert_eq!(v.make, "Audi");
        assert_eq!(v.year, 2018);
        assert_eq!(v.mileage, 95_000);
        assert_eq!(v.condition, Condition::VeryGood);
        assert!(v.has_usable_vin());
    }

    #[test]
    fn zero_mileage_is_allowed() {
        let v = request(serde_json::json!({
            "make": "toyota", "model": "Yaris", "year": 2025, "mileage": 0, "condition": "Excellent"
        }))
        .validate(YEAR)
        .unwrap();
        assert_eq!(v.mileage, 0);
        assert_eq!(v.condition, Condition::Excellent);
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let msg = problems(&request(serde_json::json!({ "vin": "" })));
        for field in ["make", "model", "year", "mileage", "condition"] {
            assert!(msg.contains(&format!("{field} is required")), "{msg}");
        }
    }

    #[test]
    fn unknown_condition_is_rejected() {
        let msg = problems(&request(serde_json::json!({
            "make": "bmw", "model": "320d", "year": 2015, "mileage": 180000, "condition": "mint"
        })));
        assert!(msg.contains("condition must be one of"), "{msg}");
    }

    #[test]
    fn negative_mileage_and_bad_years_are_rejected() {
        let msg = problems(&request(serde_json::json!({
            "make": "bmw", "model": "320d", "year": 1850, "mileage": -5, "condition": "good"
        })));
        assert!(msg.contains("mileage must not be negative"), "{msg}");
        assert!(msg.contains("year must be between 1900 and 2026"), "{msg}");

        let msg = problems(&request(serde_json::json!({
            "make": "bmw", "model": "320d", "year": "twenty", "mileage": 10.5, "condition": "good"
        })));
        assert!(msg.contains("year must be a whole number"), "{msg}");
        assert!(msg.contains("mileage must be a whole number"), "{msg}");
    }

    #[test]
    fn blank_vin_becomes_none() {
        let v = request(serde_json::json!({
            "make": "bmw", "model": "320d", "year": 2015, "mileage": 1, "condition": "good", "vin": "   "
        }))
        .validate(YEAR)
        .unwrap();
        assert_eq!(v.vin, None);
    }

    #[test]
    fn inquiry_requires_name_message_and_email() {
        let ok = InquiryRequest {
            name: Some("Maria Ivanova".to_string()),
            email: Some("maria.ivanova@example.com".to_string()),
            phone: Some(" ".to_string()),
            message: Some("Business plan pricing?".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.phone, None);

        let err = InquiryRequest {
            name: None,
            email: Some("not-an-email".to_string()),
            phone: None,
            message: Some("".to_string()),
        }
        .validate();
        let Err(AppError::Validation(msg)) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("name is required"));
        assert!(msg.contains("message is required"));
        assert!(msg.contains("a valid email is required"));
    }

    #[test]
    fn register_trims_and_checks_email() {
        let user = RegisterRequest {
            email: "  ivan@example.com ".to_string(),
            first_name: Some(" Ivan ".to_string()),
            last_name: Some("   ".to_string()),
        }
        .into_new_user()
        .unwrap();
        assert_eq!(user.email, "ivan@example.com");
        assert_eq!(user.first_name.as_deref(), Some("Ivan"));
        assert_eq!(user.last_name, None);

        let err = RegisterRequest {
            email: "ivan.example.com".to_string(),
            ..RegisterRequest::default()
        }
        .into_new_user();
        let Err(AppError::Validation(msg)) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("a valid email is required"), "{msg}");

        let err = RegisterRequest {
            email: "ivan@example.com".to_string(),
            first_name: Some("x".repeat(101)),
            last_name: None,
        }
        .into_new_user();
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("a@b.co"));
        assert!(is_plausible_email("maria.ivanova+cars@example.bg"));
        assert!(!is_plausible_email(""));
        assert!(!is_plausible_email("nobody"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@.co"));
        assert!(!is_plausible_email("a b@c.co"));
        assert!(!is_plausible_email("a@b@c.co"));
    }
}
