use cheatsheet_transport_telegram::messages::{
    fit_reply, API_ERROR_MESSAGE, OTHER_ERROR_MESSAGE, PHOTOS_ERROR_MESSAGE, PHOTO_ERROR_MESSAGE,
    WELCOME_MESSAGE,
};
use insta::assert_snapshot;

#[test]
fn test_welcome_message_snapshot() {
    assert_snapshot!(WELCOME_MESSAGE);
}

#[test]
fn test_error_messages_snapshot() {
    let all = [
        ("api", API_ERROR_MESSAGE),
        ("photo", PHOTO_ERROR_MESSAGE),
        ("photos", PHOTOS_ERROR_MESSAGE),
        ("other", OTHER_ERROR_MESSAGE),
    ]
    .iter()
    .map(|(name, text)| format!("{name}: {text}"))
    .collect::<Vec<_>>()
    .join("\n");
    assert_snapshot!(all);
}

#[test]
fn test_truncated_reply_tail_snapshot() {
    let answer = "ответ ".repeat(1000);
    let fitted = fit_reply(&answer);
    let tail: String = fitted.chars().skip(4090).collect();
    assert_snapshot!(tail);
}
