//! Tag title normalisation.

use super::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 20;

/// Trim and lowercase a tag title, rejecting empty or over-long titles.
pub fn normalize_title(raw: &str) -> Result<String, DomainError> {
    let title = raw.trim().to_lowercase();
    if title.is_empty() {
        return Err(DomainError::validation("tag title", "must not be empty"));
    }
    let length = title.chars().count();
    if length > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "tag title",
            format!("`{title}` has {length} characters, the limit is {TITLE_MAX_CHARS}"),
        ));
    }
    Ok(title)
}
