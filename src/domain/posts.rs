//! Post-level rules shared by listings, detail pages and the archive importer.

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::FormatItem,
    macros::format_description,
};

use super::error::DomainError;

pub const TITLE_MAX_CHARS: usize = 200;
pub const TEASER_CHARS: usize = 200;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year], [hour]:[minute]");
pub const ISO_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// First [`TEASER_CHARS`] characters of the post body.
pub fn teaser(text: &str) -> &str {
    match text.char_indices().nth(TEASER_CHARS) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

pub fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title", "must not be empty"));
    }
    let length = title.chars().count();
    if length > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("{length} characters exceeds the limit of {TITLE_MAX_CHARS}"),
        ));
    }
    Ok(())
}

pub fn validate_text(text: &str) -> Result<(), DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::validation("text", "must not be empty"));
    }
    Ok(())
}

/// Year boundaries `[start, end)` in UTC, used by the yearly archive.
///
/// `None` when the year lies outside the representable calendar; such a year
/// simply has no posts.
pub fn year_bounds(year: i32) -> Option<(OffsetDateTime, OffsetDateTime)> {
    let start = year_start(year)?;
    let end = year
        .checked_add(1)
        .and_then(year_start)
        .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc());
    Some((start, end))
}

fn year_start(year: i32) -> Option<OffsetDateTime> {
    time::Date::from_calendar_date(year, time::Month::January, 1)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

pub fn format_human_datetime(value: OffsetDateTime) -> String {
    value
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_iso_datetime(value: OffsetDateTime) -> String {
    value
        .to_offset(time::UtcOffset::UTC)
        .format(ISO_DATE_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}
