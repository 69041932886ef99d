use crate::error::{ApiError, ApiResult, FieldError};

use super::slug::{slugify, validate_slug};
use super::url::{normalize_asset_ref, normalize_url};

/// Collects field errors so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Non-blank and at most `max_len` characters.
    pub fn required(&mut self, field: &str, value: &str, max_len: usize) {
        if value.trim().is_empty() {
            self.add(field, "is required");
        } else {
            self.max_len(field, value, max_len);
        }
    }

    pub fn max_len(&mut self, field: &str, value: &str, max_len: usize) {
        if value.chars().count() > max_len {
            self.add(field, format!("must be at most {max_len} characters"));
        }
    }

    pub fn optional_max_len(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(value) = value {
            self.max_len(field, value, max_len);
        }
    }

    pub fn min_i64(&mut self, field: &str, value: i64, min: i64) {
        if value < min {
            self.add(field, format!("must be at least {min}"));
        }
    }

    pub fn range_f64(&mut self, field: &str, value: Option<f64>, min: f64, max: f64) {
        if let Some(value) = value {
            if !value.is_finite() || value < min || value > max {
                self.add(field, format!("must be between {min} and {max}"));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !domain.contains('@')
                    && !value.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            self.add(field, "must be a valid email address");
        }
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.add(field, format!("must be one of: {}", allowed.join(", ")));
        }
    }

    /// An explicit slug must still produce a slug once slugified.
    pub fn slug(&mut self, field: &str, explicit: Option<&str>) {
        if let Some(raw) = explicit {
            if let Err(message) = validate_slug(&slugify(raw)) {
                self.add(field, message);
            }
        }
    }

    /// Validates and returns the normalized URL, if any.
    pub fn url(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let value = value.filter(|v| !v.trim().is_empty())?;
        match normalize_url(value) {
            Ok(url) => Some(url),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    /// Like [`Validator::url`] but also accepts site-relative upload paths.
    pub fn asset(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        let value = value.filter(|v| !v.trim().is_empty())?;
        match normalize_asset_ref(value) {
            Ok(url) => Some(url),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    /// Validates each entry of a list of asset references.
    pub fn assets(&mut self, field: &str, values: &[String]) -> Vec<String> {
        values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| self.asset(&format!("{field}[{idx}]"), Some(value)))
            .collect()
    }

    /// Each list entry must be non-blank and within `max_len`.
    pub fn string_list(&mut self, field: &str, values: &[String], max_len: usize) {
        for (idx, value) in values.iter().enumerate() {
            self.required(&format!("{field}[{idx}]"), value, max_len);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> ApiResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Trim, and turn blank strings into `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(result: ApiResult<()>) -> Vec<String> {
        match result {
            Err(ApiError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => Vec::new(),
        }
    }

    #[test]
    fn test_required_and_length() {
        let mut v = Validator::new();
        v.required("name", "   ", 10);
        v.required("title", "this is far too long", 10);
        v.required("country", "Peru", 10);
        assert_eq!(fields(v.finish()), vec!["name", "title"]);
    }

    #[test]
    fn test_numeric_checks() {
        let mut v = Validator::new();
        v.min_i64("durationDays", 0, 1);
        v.range_f64("latitude", Some(91.0), -90.0, 90.0);
        v.range_f64("longitude", Some(f64::NAN), -180.0, 180.0);
        v.range_f64("longitude2", None, -180.0, 180.0);
        assert_eq!(fields(v.finish()), vec!["durationDays", "latitude", "longitude"]);
    }

    #[test]
    fn test_one_of() {
        let mut v = Validator::new();
        v.one_of("kind", "tour", &["destination", "tour"]);
        v.one_of("sort", "price", &["name", "createdAt"]);
        let Err(ApiError::Validation(errors)) = v.finish() else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "must be one of: name, createdAt");
    }

    #[test]
    fn test_explicit_slug() {
        let mut v = Validator::new();
        v.slug("slug", None);
        v.slug("slug", Some("Bali Trip"));
        assert!(v.is_empty());

        v.slug("slug", Some("?!"));
        assert_eq!(fields(v.finish()), vec!["slug"]);
    }

    #[test]
    fn test_email() {
        let mut v = Validator::new();
        v.email("a", "editor@visit.example");
        assert!(v.is_empty());

        v.email("b", "no-at-sign");
        v.email("c", "@example.com");
        v.email("d", "user@localhost");
        v.email("e", "user name@example.com");
        assert_eq!(fields(v.finish()), vec!["b", "c", "d", "e"]);
    }

    #[test]
    fn test_url_and_assets() {
        let mut v = Validator::new();
        assert_eq!(
            v.url("ticketUrl", Some("https://example.com/tickets/")),
            Some("https://example.com/tickets".to_string())
        );
        assert_eq!(v.url("ticketUrl", Some("  ")), None);
        assert!(v.is_empty());

        let gallery = vec!["/uploads/a.jpg".to_string(), "ftp://x/y.png".to_string()];
        let cleaned = v.assets("gallery", &gallery);
        assert_eq!(cleaned, vec!["/uploads/a.jpg"]);
        assert_eq!(fields(v.finish()), vec!["gallery[1]"]);
    }

    #[test]
    fn test_clean_optional() {
        assert_eq!(clean_optional(Some("  hi ".into())), Some("hi".to_string()));
        assert_eq!(clean_optional(Some("   ".into())), None);
        assert_eq!(clean_optional(None), None);
    }
}
