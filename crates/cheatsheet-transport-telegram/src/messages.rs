//! Fixed user-facing texts.

/// Reply to `/start` and `/help`
pub const WELCOME_MESSAGE: &str = "Я помогу подготовить ответ на экзаменационный вопрос по дисциплине \"Операционные системы\".\nПришлите мне фотографию с вопросом или наберите его текстом.";
/// Completion call failed
pub const API_ERROR_MESSAGE: &str = "Я не смог подготовить ответ на экзаменационный вопрос.";
/// Photo could not be downloaded or recognized
pub const PHOTO_ERROR_MESSAGE: &str = "Я не могу обработать эту фотографию.";
/// Album received; sent once per media group
pub const PHOTOS_ERROR_MESSAGE: &str = "Я могу обработать только одну фотографию.";
/// Neither text nor photo
pub const OTHER_ERROR_MESSAGE: &str =
    "Я могу обработать только текстовое сообщение или фотографию.";

/// Telegram's hard limit for a single message, in UTF-16 code units
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

const TRUNCATION_MARKER: char = '…';

/// Length of `text` as Telegram measures it
#[must_use]
pub fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Fit an answer into one Telegram message.
///
/// Measures UTF-16 code units, so characters outside the BMP (emoji) count
/// twice. Overlong answers are cut on a character boundary and end with an
/// ellipsis.
#[must_use]
pub fn fit_reply(text: &str) -> String {
    if telegram_len(text) <= TELEGRAM_MESSAGE_LIMIT {
        return text.to_string();
    }
    let budget = TELEGRAM_MESSAGE_LIMIT - TRUNCATION_MARKER.len_utf16();
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        out.push(c);
    }
    out.push(TRUNCATION_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_reply_keeps_short_text() {
        assert_eq!(fit_reply("Привет, мир!"), "Привет, мир!");
    }

    #[test]
    fn test_fit_reply_truncates_by_chars() {
        let long = "ж".repeat(TELEGRAM_MESSAGE_LIMIT + 100);
        let fitted = fit_reply(&long);
        assert_eq!(fitted.chars().count(), TELEGRAM_MESSAGE_LIMIT);
        assert!(fitted.ends_with('…'));
    }

    #[test]
    fn test_fit_reply_counts_utf16_units() {
        // Each emoji is one char but two UTF-16 code units
        let emoji = "😀".repeat(TELEGRAM_MESSAGE_LIMIT / 2 + 10);
        assert!(emoji.chars().count() < TELEGRAM_MESSAGE_LIMIT);

        let fitted = fit_reply(&emoji);
        assert!(telegram_len(&fitted) <= TELEGRAM_MESSAGE_LIMIT);
        assert!(fitted.ends_with('…'));
        assert_eq!(fitted.chars().filter(|c| *c == '😀').count(), 2047);
    }

    #[test]
    fn test_fit_reply_emoji_at_limit_untouched() {
        let emoji = "😀".repeat(TELEGRAM_MESSAGE_LIMIT / 2);
        assert_eq!(fit_reply(&emoji), emoji);
    }

    #[test]
    fn test_fit_reply_exact_limit_untouched() {
        let exact = "a".repeat(TELEGRAM_MESSAGE_LIMIT);
        assert_eq!(fit_reply(&exact), exact);
    }
}
