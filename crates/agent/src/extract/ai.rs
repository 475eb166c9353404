use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quotedesk_core::domain::fields::{CandidateFields, FieldName};
use quotedesk_core::errors::ExtractionFailure;
use quotedesk_core::normalize::check_required;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::extract::FieldExtractor;
use crate::llm::LlmClient;

pub const EXTRACTION_INSTRUCTION: &str = r#"You extract quotation details from a customer's message.

Return a SINGLE minified JSON object (no backticks, no prose) with exactly these keys:
q_no, date, company_name, customer_name, product, quantity, rate, units, hsn, email.

Rules:
- Every value is a string. Use "" for anything the message does not state.
- quantity and rate contain digits and an optional decimal point only.
- date is written as "Month DD, YYYY" when the message gives one.
- Do not invent an email address.

Example output:
{"q_no":"101","date":"November 05, 2025","company_name":"Raj Pvt Ltd","customer_name":"Raju","product":"3 inch pipe","quantity":"500","rate":"600","units":"Pcs","hsn":"7304","email":"raju@example.com"}"#;

pub struct AiExtractor {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl AiExtractor {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl FieldExtractor for AiExtractor {
    fn name(&self) -> &'static str {
        "ai"
    }

    async fn extract(&self, text: &str) -> Result<CandidateFields, ExtractionFailure> {
        let completion =
            tokio::time::timeout(self.timeout, self.client.complete(EXTRACTION_INSTRUCTION, text))
                .await;

        let raw = match completion {
            Err(_) => {
                warn!(
                    event_name = "pipeline.extract.timeout",
                    client = self.client.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "model call timed out"
                );
                return Err(ExtractionFailure::Timeout { secs: self.timeout.as_secs() });
            }
            Ok(Err(error)) => return Err(ExtractionFailure::Model(format!("{error:#}"))),
            Ok(Ok(raw)) => raw,
        };
        debug!(client = self.client.name(), raw = %raw, "model extraction response");

        let fields = parse_model_response(&raw)?;
        let missing = fields.missing_required();
        if !missing.is_empty() {
            return Err(ExtractionFailure::MissingRequired(missing));
        }
        // Numbers in words or an invented address would only fail validation later.
        if let Err(failure) = check_required(&fields) {
            warn!(
                event_name = "pipeline.extract.invalid",
                client = self.client.name(),
                error = %failure,
                "model returned unusable fields"
            );
            return Err(ExtractionFailure::Invalid(failure));
        }
        Ok(fields)
    }
}

/// Reads the first `{ ... }` object out of a model reply, ignoring code fences and prose.
pub fn parse_model_response(raw: &str) -> Result<CandidateFields, ExtractionFailure> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let object = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => return Err(ExtractionFailure::Unparseable(preview(raw))),
    };

    let map = serde_json::from_str::<Map<String, Value>>(object)
        .map_err(|error| ExtractionFailure::Unparseable(format!("{error}: {}", preview(raw))))?;

    let mut fields = CandidateFields::default();
    for (key, value) in map {
        let Some(field) = FieldName::from_key(&key.trim().to_ascii_lowercase()) else {
            continue;
        };
        let text = match value {
            Value::String(text) => text.trim().to_owned(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        };
        fields.set(field, text);
    }
    Ok(fields)
}

fn preview(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(120) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use quotedesk_core::domain::fields::FieldName;
    use quotedesk_core::errors::{ExtractionFailure, ValidationFailure};

    use super::{parse_model_response, AiExtractor};
    use crate::extract::FieldExtractor;
    use crate::llm::LlmClient;

    enum Reply {
        Text(&'static str),
        Error,
        Hang,
    }

    struct FixedLlm(Reply);

    #[async_trait]
    impl LlmClient for FixedLlm {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn complete(&self, _instruction: &str, _text: &str) -> Result<String> {
            match self.0 {
                Reply::Text(text) => Ok(text.to_owned()),
                Reply::Error => Err(anyhow!("503 service unavailable")),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn extractor(reply: Reply) -> AiExtractor {
        AiExtractor::new(Arc::new(FixedLlm(reply)), Duration::from_millis(50))
    }

    #[test]
    fn strips_fences_and_prose_around_the_object() {
        let raw = "Sure! Here you go:\n```json\n{\"customer_name\":\"Raju\",\"product\":\"3 inch pipe\"}\n```\nAnything else?";
        let fields = parse_model_response(raw).expect("object is found");
        assert_eq!(fields.customer_name, "Raju");
        assert_eq!(fields.product, "3 inch pipe");
        assert!(fields.email.is_empty());
    }

    #[test]
    fn stringifies_scalars_and_blanks_nulls() {
        let raw = r#"{"quantity":500,"rate":600.5,"hsn":null,"q_no":true,"units":["Pcs"],"extra":"ignored"}"#;
        let fields = parse_model_response(raw).expect("valid object");
        assert_eq!(fields.quantity, "500");
        assert_eq!(fields.rate, "600.5");
        assert_eq!(fields.hsn, "");
        assert_eq!(fields.q_no, "true");
        assert_eq!(fields.units, "");
    }

    #[test]
    fn non_object_replies_are_unparseable() {
        for raw in ["I could not find any details.", "[1, 2, 3]", "{ not json }"] {
            let error = parse_model_response(raw).expect_err("no object");
            assert!(matches!(error, ExtractionFailure::Unparseable(_)), "{raw}: {error:?}");
        }
    }

    #[tokio::test]
    async fn complete_reply_is_accepted() {
        let extractor = extractor(Reply::Text(
            r#"{"customer_name":"Raju","product":"3 inch pipe","quantity":"500","rate":"600","email":"raju@example.com","units":"Pcs"}"#,
        ));
        let fields = extractor.extract("anything").await.expect("complete reply");
        assert_eq!(fields.email, "raju@example.com");
        assert!(fields.missing_required().is_empty());
    }

    #[tokio::test]
    async fn blank_required_fields_fail_extraction() {
        let extractor = extractor(Reply::Text(
            r#"{"customer_name":"Raju","product":"3 inch pipe","quantity":"500","rate":"","email":""}"#,
        ));
        let error = extractor.extract("anything").await.expect_err("missing fields");
        assert_eq!(
            error,
            ExtractionFailure::MissingRequired(vec![FieldName::Email, FieldName::Rate])
        );
    }

    #[tokio::test]
    async fn unusable_numbers_or_email_fail_extraction() {
        let words = extractor(Reply::Text(
            r#"{"customer_name":"Raju","product":"pipe","quantity":"five hundred","rate":"600","email":"raju@example.com"}"#,
        ));
        let error = words.extract("anything").await.expect_err("quantity in words");
        assert!(matches!(
            error,
            ExtractionFailure::Invalid(ValidationFailure::InvalidNumber {
                field: FieldName::Quantity,
                ..
            })
        ));

        let bad_email = extractor(Reply::Text(
            r#"{"customer_name":"Raju","product":"pipe","quantity":"5","rate":"600","email":"raju at example"}"#,
        ));
        let error = bad_email.extract("anything").await.expect_err("invalid email");
        assert!(matches!(error, ExtractionFailure::Invalid(ValidationFailure::InvalidEmail(_))));
    }

    #[tokio::test]
    async fn model_errors_and_timeouts_are_extraction_failures() {
        let error = extractor(Reply::Error).extract("text").await.expect_err("model error");
        assert!(matches!(error, ExtractionFailure::Model(message) if message.contains("503")));

        let error = extractor(Reply::Hang).extract("text").await.expect_err("timeout");
        assert!(matches!(error, ExtractionFailure::Timeout { .. }));
    }
}
