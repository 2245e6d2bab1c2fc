use crate::error::AppError;

/// Column width of every short text field.
pub const MAX_TEXT_LEN: usize = 255;

/// Trimmed, non-blank text no longer than [`MAX_TEXT_LEN`] characters.
pub fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} may not be blank")));
    }
    bounded(trimmed, field)
}

/// Trimmed text that may be empty.
pub fn optional_text(value: &str, field: &str) -> Result<String, AppError> {
    bounded(value.trim(), field)
}

fn bounded(value: &str, field: &str) -> Result<String, AppError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::validation(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(value.to_string())
}
