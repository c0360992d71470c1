//! Request template validation and substitution.
//!
//! Templates are opaque JSON provisioned next to the function. Only the fields
//! overwritten here are checked; everything else is sent as-is.

use crate::inference::InferenceError;
use serde_json::Value;

/// Index of the user message inside the completion template's `messages`
const QUESTION_MESSAGE_INDEX: usize = 1;

/// Check that a completion template can take a question.
///
/// # Errors
///
/// Returns `InferenceError::InvalidTemplate` if the template is not an object or
/// has no object at `messages[1]`.
pub fn validate_completion_template(template: &Value) -> Result<(), InferenceError> {
    if !template.is_object() {
        return Err(InferenceError::InvalidTemplate(
            "completion template must be a JSON object".into(),
        ));
    }
    let messages = template
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            InferenceError::InvalidTemplate("completion template has no `messages` array".into())
        })?;
    match messages.get(QUESTION_MESSAGE_INDEX) {
        Some(message) if message.is_object() => Ok(()),
        Some(_) => Err(InferenceError::InvalidTemplate(format!(
            "`messages[{QUESTION_MESSAGE_INDEX}]` must be an object"
        ))),
        None => Err(InferenceError::InvalidTemplate(format!(
            "`messages` needs at least {} entries, found {}",
            QUESTION_MESSAGE_INDEX + 1,
            messages.len()
        ))),
    }
}

/// Check that a recognition template can take image content.
///
/// # Errors
///
/// Returns `InferenceError::InvalidTemplate` if the template is not an object.
pub fn validate_recognition_template(template: &Value) -> Result<(), InferenceError> {
    if template.is_object() {
        Ok(())
    } else {
        Err(InferenceError::InvalidTemplate(
            "recognition template must be a JSON object".into(),
        ))
    }
}

/// Build the completion request body: model URI plus the question as the user message.
///
/// # Errors
///
/// Returns `InferenceError::InvalidTemplate` if the template fails validation.
pub fn apply_completion_template(
    mut template: Value,
    model_uri: &str,
    question: &str,
) -> Result<Value, InferenceError> {
    validate_completion_template(&template)?;
    template["modelUri"] = Value::String(model_uri.to_string());
    template["messages"][QUESTION_MESSAGE_INDEX]["text"] = Value::String(question.to_string());
    Ok(template)
}

/// Build the recognition request body with base64 image content.
///
/// # Errors
///
/// Returns `InferenceError::InvalidTemplate` if the template is not an object.
pub fn apply_recognition_template(
    mut template: Value,
    content_base64: String,
) -> Result<Value, InferenceError> {
    validate_recognition_template(&template)?;
    template["content"] = Value::String(content_base64);
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn completion_template() -> Value {
        json!({
            "modelUri": "",
            "completionOptions": {"stream": false, "temperature": 0.3, "maxTokens": "2000"},
            "messages": [
                {"role": "system", "text": "Answer the exam question."},
                {"role": "user", "text": ""}
            ]
        })
    }

    #[test]
    fn test_apply_completion_template_sets_question_and_model() {
        let body = apply_completion_template(
            completion_template(),
            "gpt://b1g/yandexgpt",
            "What is a page fault?",
        )
        .expect("valid template");

        assert_eq!(body["modelUri"], "gpt://b1g/yandexgpt");
        assert_eq!(body["messages"][1]["text"], "What is a page fault?");
        assert_eq!(body["messages"][1]["role"], "user");
        // Untouched fields survive
        assert_eq!(body["messages"][0]["text"], "Answer the exam question.");
        assert_eq!(body["completionOptions"]["temperature"], 0.3);
    }

    #[test]
    fn test_completion_template_needs_two_messages() {
        let template = json!({"messages": [{"role": "system", "text": "x"}]});
        let err = apply_completion_template(template, "uri", "q").expect_err("one message");
        assert!(matches!(err, InferenceError::InvalidTemplate(msg) if msg.contains("at least 2")));
    }

    #[test]
    fn test_completion_template_rejects_non_object_message() {
        let template = json!({"messages": [{}, "user"]});
        assert!(matches!(
            validate_completion_template(&template),
            Err(InferenceError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_completion_template_rejects_missing_messages() {
        assert!(validate_completion_template(&json!({"modelUri": "x"})).is_err());
        assert!(validate_completion_template(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_apply_recognition_template() {
        let template = json!({"mimeType": "JPEG", "languageCodes": ["ru", "en"], "model": "page"});
        let body = apply_recognition_template(template, "aGVsbG8=".to_string()).expect("object");

        assert_eq!(body["content"], "aGVsbG8=");
        assert_eq!(body["mimeType"], "JPEG");
    }

    #[test]
    fn test_recognition_template_must_be_object() {
        assert!(apply_recognition_template(json!("text"), String::new()).is_err());
    }
}
