//! Prompt text for completion and title requests.

use super::MAX_TITLE_LENGTH;
use crate::domain::foundation::Timestamp;

/// Appended after the assistant's reply when asking the provider for a title.
pub const TITLE_INSTRUCTION: &str = "Give this conversation a short title, the way a chat app \
would list it in its sidebar. Reply with the title only, without quotes, punctuation or emoji.";

/// Fixed instruction that opens every completion request.
pub fn system_instruction(now: Timestamp) -> String {
    format!(
        "You are a helpful assistant. Format every answer with Markdown. \
         Reply in the language the user writes in. Current date: {}.",
        now.calendar_date()
    )
}

/// Cleans a generated title.
///
/// Takes the first non-empty line, strips surrounding quotes and a trailing
/// period, and caps the length. `None` when nothing usable remains.
pub fn normalize_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;

    let unquoted = line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '“' | '”' | '*' | '#'))
        .trim()
        .trim_end_matches('.')
        .trim();

    if unquoted.is_empty() {
        return None;
    }

    Some(unquoted.chars().take(MAX_TITLE_LENGTH).collect::<String>().trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn system_instruction_carries_current_date() {
        let now = Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap());
        let text = system_instruction(now);

        assert!(text.contains("Markdown"));
        assert!(text.ends_with("Current date: Tuesday, March 5, 2024."));
    }

    #[test]
    fn normalize_title_strips_quotes_and_period() {
        assert_eq!(
            normalize_title("  \"Greeting the assistant.\"  "),
            Some("Greeting the assistant".to_string())
        );
    }

    #[test]
    fn normalize_title_uses_first_non_empty_line() {
        assert_eq!(
            normalize_title("\n\n## Rust lifetimes\nextra commentary"),
            Some("Rust lifetimes".to_string())
        );
    }

    #[test]
    fn normalize_title_rejects_empty_output() {
        assert_eq!(normalize_title(""), None);
        assert_eq!(normalize_title("  \n \"\" "), None);
    }

    #[test]
    fn normalize_title_caps_length() {
        let raw = "word ".repeat(60);
        let title = normalize_title(&raw).unwrap();
        assert!(title.chars().count() <= MAX_TITLE_LENGTH);
        assert!(!title.ends_with(' '));
    }
}
