//! Field checks for public form submissions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use pharmacy_database::CustomerContact;
use regex::Regex;
use serde::Deserialize;
use utoipa::ToSchema;

use super::ServiceError;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

const MAX_TEXT_LENGTH: usize = 2_000;

/// Contact block shared by every public form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
}

/// Collects problems so a submission reports all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    problems: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problem(&mut self, field: &str, message: &str) {
        self.problems.push(format!("{field}: {message}"));
    }

    /// Trimmed value, or a "required" problem when blank.
    pub fn required(&mut self, field: &str, value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.problem(field, "is required");
        } else if trimmed.chars().count() > MAX_TEXT_LENGTH {
            self.problem(field, "is too long");
        }
        trimmed.to_string()
    }

    pub fn optional(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
        if trimmed.chars().count() > MAX_TEXT_LENGTH {
            self.problem(field, "is too long");
        }
        Some(trimmed.to_string())
    }

    pub fn email(&mut self, field: &str, value: &str) -> String {
        let email = value.trim().to_lowercase();
        if email.is_empty() {
            self.problem(field, "is required");
        } else if !is_valid_email(&email) {
            self.problem(field, "must be a valid email address");
        }
        email
    }

    pub fn phone(&mut self, field: &str, value: &str) -> String {
        let phone = value.trim();
        if phone.is_empty() {
            self.problem(field, "is required");
        } else if !is_valid_phone(phone) {
            self.problem(field, "must contain 10 to 15 digits");
        }
        phone.to_string()
    }

    /// A calendar date strictly before today.
    pub fn birth_date(&mut self, field: &str, value: &str, today: NaiveDate) -> String {
        let value = value.trim();
        match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            Ok(date) if date < today => {}
            Ok(_) => self.problem(field, "must be in the past"),
            Err(_) => self.problem(field, "must be a date in YYYY-MM-DD format"),
        }
        value.to_string()
    }

    /// A date and time strictly after `now`, interpreted as UTC when no
    /// offset is given.
    pub fn future_datetime(
        &mut self,
        field: &str,
        date: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .ok()
            .zip(parse_time(time.trim()))
            .map(|(date, time)| NaiveDateTime::new(date, time).and_utc());

        match parsed {
            Some(at) if at > now => Some(at),
            Some(_) => {
                self.problem(field, "must be in the future");
                None
            }
            None => {
                self.problem(field, "must be a date (YYYY-MM-DD) and time (HH:MM)");
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.problems))
        }
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL.is_match(value)
}

/// Digits may be separated by spaces, dots, dashes or parentheses and
/// prefixed with `+`.
pub fn is_valid_phone(value: &str) -> bool {
    let allowed = value
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || " .-()".contains(c) || (c == '+' && i == 0));
    let digits = value.chars().filter(char::is_ascii_digit).count();
    allowed && (10..=15).contains(&digits)
}

/// Validate the shared contact block into a repository contact.
pub fn contact(
    validator: &mut Validator,
    form: &ContactForm,
    require_phone: bool,
    today: NaiveDate,
) -> CustomerContact {
    let first_name = validator.required("first_name", &form.first_name);
    let last_name = validator.required("last_name", &form.last_name);
    let email = validator.email("email", &form.email);

    let phone = match form.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(phone) => Some(validator.phone("phone", phone)),
        None if require_phone => {
            validator.problem("phone", "is required");
            None
        }
        None => None,
    };

    let date_of_birth = form
        .date_of_birth
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|dob| validator.birth_date("date_of_birth", dob, today));

    CustomerContact {
        email,
        first_name,
        last_name,
        phone,
        date_of_birth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("jane.doe+rx@pharmacy.example.com"));
        assert!(!is_valid_email("jane@localhost"));
        assert!(!is_valid_email("not an email"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn phone_digit_bounds() {
        assert!(is_valid_phone("(555) 123-4567"));
        assert!(is_valid_phone("+44 20 7946 0958"));
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone("555 123 4567 ext 2"));
        assert!(!is_valid_phone("55+5 123 4567"));
    }

    #[test]
    fn contact_collects_every_problem() {
        let form = ContactForm {
            first_name: " ".into(),
            last_name: "Doe".into(),
            email: "nope".into(),
            phone: None,
            date_of_birth: Some("2030-01-01".into()),
        };
        let mut validator = Validator::new();
        contact(&mut validator, &form, true, today());

        let Err(ServiceError::Validation(problems)) = validator.finish() else {
            panic!("expected validation failure");
        };
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.starts_with("first_name")));
        assert!(problems.iter().any(|p| p.starts_with("email")));
        assert!(problems.iter().any(|p| p == "phone: is required"));
        assert!(problems.iter().any(|p| p == "date_of_birth: must be in the past"));
    }

    #[test]
    fn contact_normalises_values() {
        let form = ContactForm {
            first_name: " Jane ".into(),
            last_name: "Doe".into(),
            email: " Jane@Example.COM ".into(),
            phone: Some(" 555-123-4567 ".into()),
            date_of_birth: Some("1980-02-29".into()),
        };
        let mut validator = Validator::new();
        let contact = contact(&mut validator, &form, true, today());
        validator.finish().unwrap();

        assert_eq!(contact.first_name, "Jane");
        assert_eq!(contact.email, "jane@example.com");
        assert_eq!(contact.phone.as_deref(), Some("555-123-4567"));
    }

    #[test]
    fn future_datetime_requires_future_and_format() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut validator = Validator::new();

        let at = validator.future_datetime("preferred_date", "2025-06-02", "09:30", now);
        assert_eq!(at, Some(Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap()));
        assert!(validator
            .future_datetime("preferred_date", "2025-06-01", "11:59", now)
            .is_none());
        assert!(validator
            .future_datetime("preferred_date", "06/02/2025", "9am", now)
            .is_none());

        let Err(ServiceError::Validation(problems)) = validator.finish() else {
            panic!("expected validation failure");
        };
        assert_eq!(problems.len(), 2);
    }
}
