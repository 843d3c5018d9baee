use regex::Regex;
use std::sync::OnceLock;

use super::ApiError;
use crate::domain::AdId;

const MAX_TEXT_LEN: usize = 255;
const MAX_CATEGORIES: usize = 10;
const MAX_INSTRUCTIONS_LEN: usize = 1000;
const MAX_PER_PAGE: u64 = 100;
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern"))
}

pub fn validate_event_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("event_name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ApiError::validation(format!(
            "event_name must be {MAX_TEXT_LEN} characters or less"
        )));
    }
    Ok(trimmed)
}

/// Optional free-text field capped at 255 characters. Blank becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<String>,
) -> Result<Option<String>, ApiError> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ApiError::validation(format!(
            "{field} must be {MAX_TEXT_LEN} characters or less"
        )));
    }
    Ok(Some(value))
}

/// 1 to 10 non-empty categories, deduplicated in first-seen order.
pub fn validate_categories(categories: Vec<String>) -> Result<Vec<String>, ApiError> {
    let mut unique: Vec<String> = Vec::with_capacity(categories.len());
    for category in categories {
        let category = category.trim().to_string();
        if category.is_empty() {
            return Err(ApiError::validation("product_categories cannot contain empty values"));
        }
        if !unique.contains(&category) {
            unique.push(category);
        }
    }

    if unique.is_empty() {
        return Err(ApiError::validation("At least one product category is required"));
    }
    if unique.len() > MAX_CATEGORIES {
        return Err(ApiError::validation(format!(
            "Maximum {MAX_CATEGORIES} product categories allowed"
        )));
    }
    Ok(unique)
}

pub fn validate_instructions(instructions: Option<&str>) -> Result<(), ApiError> {
    if instructions.is_some_and(|s| s.chars().count() > MAX_INSTRUCTIONS_LEN) {
        return Err(ApiError::validation(format!(
            "additional_instructions must be {MAX_INSTRUCTIONS_LEN} characters or less"
        )));
    }
    Ok(())
}

pub fn validate_ad_id(id: AdId) -> Result<AdId, ApiError> {
    if id.value() <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid ad ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(id)
}

pub fn validate_page(page: u64, per_page: u64) -> Result<(u64, u64), ApiError> {
    if page == 0 {
        return Err(ApiError::validation("page must be 1 or greater"));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(ApiError::validation(format!(
            "Invalid per_page: {per_page}. Must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    Ok((page, per_page))
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^[A-Za-z0-9_-]{3,50}$");

    if !re.is_match(username) {
        return Err(ApiError::validation(
            "Username must be 3-50 characters of letters, numbers, underscores or hyphens",
        ));
    }
    Ok(username)
}

pub fn validate_email(email: &str) -> Result<String, ApiError> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$");

    let email = email.trim();
    if !re.is_match(email) {
        return Err(ApiError::validation("Invalid email address"));
    }
    Ok(email.to_lowercase())
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters long",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::validation(
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ApiError::validation(
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation(
            "Password must contain at least one digit",
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(ApiError::validation(
            "Password must contain at least one special character",
        ));
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_event_name() {
        assert_eq!(validate_event_name("  Black Friday ").unwrap(), "Black Friday");
        assert!(validate_event_name("").is_err());
        assert!(validate_event_name("   ").is_err());
        assert!(validate_event_name(&"x".repeat(255)).is_ok());
        assert!(validate_event_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_categories_dedups_in_order() {
        let cats = validate_categories(vec![
            "shoes".into(),
            "bags".into(),
            "shoes".into(),
            " hats ".into(),
        ])
        .unwrap();
        assert_eq!(cats, vec!["shoes", "bags", "hats"]);

        assert!(validate_categories(vec![]).is_err());
        assert!(validate_categories(vec!["ok".into(), " ".into()]).is_err());
        assert!(validate_categories((0..11).map(|i| format!("c{i}")).collect()).is_err());

        // Duplicates collapse before the cap applies.
        let mut many: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        many.push("c0".into());
        assert_eq!(validate_categories(many).unwrap().len(), 10);
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Str0ng!pass").is_ok());
        assert!(validate_password("Sh0rt!").is_err());
        assert!(validate_password("nouppercase1!").is_err());
        assert!(validate_password("NOLOWERCASE1!").is_err());
        assert!(validate_password("NoDigits!!").is_err());
        assert!(validate_password("NoSpecial123").is_err());
    }

    #[test]
    fn test_validate_username_and_email() {
        assert!(validate_username("ana_lima-2").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());

        assert_eq!(validate_email(" Ana@Acme.IO ").unwrap(), "ana@acme.io");
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_validate_page_and_text() {
        assert!(validate_page(1, 20).is_ok());
        assert!(validate_page(0, 20).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(1, 101).is_err());

        assert_eq!(validate_optional_text("location", Some("  ".into())).unwrap(), None);
        assert!(validate_optional_text("location", Some("x".repeat(256))).is_err());
        assert!(validate_instructions(Some(&"y".repeat(1001))).is_err());
        assert!(validate_ad_id(AdId::new(0)).is_err());
    }
}
