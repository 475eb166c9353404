use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use quotedesk_cli::commands::{config, doctor, extract, quote, EXIT_CONFIG, EXIT_EXTRACTION};
use quotedesk_core::config::AppConfig;
use quotedesk_core::notify::{NotificationSink, NotifyError};
use quotedesk_core::render::DocumentFormat;
use serde_json::Value;
use tempfile::TempDir;

const RAJU_ENQUIRY: &str = "Name: Raju\n\
Product: 3 inch pipe\n\
Quantity: 500\n\
Rate: 600\n\
Units: Pcs\n\
Email: raju@example.com";

#[derive(Default)]
struct RecordingSink {
    notes: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        self.notes
            .lock()
            .expect("sink mutex should not be poisoned")
            .push((recipient.to_owned(), text.to_owned()));
        Ok(())
    }
}

#[test]
fn extract_rules_only_reports_normalized_quotation() {
    with_env(&[("QUOTEDESK_LLM_ENABLED", "false")], || {
        let result = extract::run(RAJU_ENQUIRY, true);
        assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "extract");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["extractor"], "rules");
        assert_eq!(payload["fields"]["customer_name"], "Raju");
        assert_eq!(payload["quotation"]["quantity"], 500);
        assert_eq!(payload["quotation"]["total_display"], "₹300,000.00");
    });
}

#[test]
fn extract_without_email_is_a_validation_error() {
    with_env(&[("QUOTEDESK_LLM_ENABLED", "false")], || {
        let result = extract::run("Name: Raju\nProduct: pipe\nQuantity: 5\nRate: 10", false);
        assert_eq!(result.exit_code, EXIT_EXTRACTION);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
        assert!(payload["quotation"].is_null());
        assert!(payload["message"].as_str().unwrap_or_default().contains("email"));
    });
}

#[test]
fn extract_returns_config_failure_for_invalid_env() {
    with_env(&[("QUOTEDESK_SERVER_PORT", "eighty")], || {
        let result = extract::run(RAJU_ENQUIRY, true);
        assert_eq!(result.exit_code, EXIT_CONFIG);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn quote_delivers_to_outbox_and_replies_to_sender() {
    let dir = TempDir::new().expect("temp dir");
    let config = local_config(&dir);
    let sink = Arc::new(RecordingSink::default());

    let result = quote::run_with_sink(&config, RAJU_ENQUIRY, "919800000001", sink.clone());
    assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["report"]["outcome"]["status"], "delivered");
    assert_eq!(payload["report"]["outcome"]["transport"], "outbox");
    assert_eq!(payload["report"]["states"].as_array().map(Vec::len), Some(6));

    let queued = std::fs::read_dir(dir.path().join("outbox")).expect("outbox").count();
    assert_eq!(queued, 1);

    let notes = sink.notes.lock().expect("sink mutex should not be poisoned");
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, "919800000001");
    assert_eq!(notes[0].1, "Success! Your quotation for 3 inch pipe was emailed to raju@example.com.");
}

#[test]
fn quote_with_unreadable_enquiry_sends_guidance() {
    let dir = TempDir::new().expect("temp dir");
    let config = local_config(&dir);
    let sink = Arc::new(RecordingSink::default());

    let result = quote::run_with_sink(&config, "hello, price please", "919800000002", sink.clone());
    assert_ne!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["report"]["outcome"]["kind"], "validation");

    let notes = sink.notes.lock().expect("sink mutex should not be poisoned");
    assert_eq!(notes.len(), 1);
    assert!(notes[0].1.starts_with("Sorry, I couldn't read all details."));
    assert!(!dir.path().join("outbox").exists());
}

#[test]
fn doctor_passes_with_local_setup() {
    let dir = TempDir::new().expect("temp dir");
    let outbox = dir.path().join("outbox").display().to_string();
    let template = repository_template().display().to_string();

    with_env(
        &[
            ("QUOTEDESK_LLM_ENABLED", "false"),
            ("QUOTEDESK_RENDER_FORMAT", "html"),
            ("QUOTEDESK_RENDER_TEMPLATE_PATH", template.as_str()),
            ("QUOTEDESK_OUTBOX_DIR", outbox.as_str()),
        ],
        || {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["overall_status"], "pass");
            let checks = payload["checks"].as_array().cloned().unwrap_or_default();
            let status_of = |name: &str| {
                checks
                    .iter()
                    .find(|check| check["name"] == name)
                    .map(|check| check["status"].clone())
                    .unwrap_or(Value::Null)
            };
            assert_eq!(status_of("template_render"), "pass");
            assert_eq!(status_of("pdf_converter"), "skipped");
            assert_eq!(status_of("llm_client"), "skipped");
            assert_eq!(status_of("delivery_transports"), "pass");
        },
    );
}

#[test]
fn doctor_fails_when_template_is_missing() {
    with_env(
        &[
            ("QUOTEDESK_LLM_ENABLED", "false"),
            ("QUOTEDESK_RENDER_TEMPLATE_PATH", "/nonexistent/quotation.html.tera"),
        ],
        || {
            let result = doctor::run(false);
            assert_eq!(result.exit_code, 1);
            assert!(result.output.contains("- [fail] template_render:"), "{}", result.output);
        },
    );
}

#[test]
fn config_output_redacts_secrets_and_names_sources() {
    with_env(
        &[
            ("QUOTEDESK_POSTMARK_SERVER_TOKEN", "pm-live-secret"),
            ("QUOTEDESK_SMTP_PASSWORD", "smtp-app-password"),
            ("QUOTEDESK_QUOTATION_SELLER_NAME", "Nivee Metal Products"),
        ],
        || {
            let output = config::run();
            assert!(!output.contains("pm-live-secret"));
            assert!(!output.contains("smtp-app-password"));
            assert!(output.contains(
                "- delivery.smtp.password = <redacted> (source: env (QUOTEDESK_SMTP_PASSWORD))"
            ));
            assert!(output.contains(
                "- delivery.postmark.server_token = <redacted> (source: env (QUOTEDESK_POSTMARK_SERVER_TOKEN))"
            ));
            assert!(output.contains(
                "- quotation.seller_name = Nivee Metal Products (source: env (QUOTEDESK_QUOTATION_SELLER_NAME))"
            ));
            assert!(output.contains("- llm.api_key = <unset> (source: default)"));
        },
    );
}

fn repository_template() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../templates/quotation.html.tera")
}

fn local_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.llm.enabled = false;
    config.quotation.seller_name = "Nivee Metal Products".to_string();
    config.render.template_path = repository_template();
    config.render.output_dir = dir.path().join("spool");
    config.render.format = DocumentFormat::Html;
    config.delivery.outbox.dir = dir.path().join("outbox");
    config
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "QUOTEDESK_LLM_ENABLED",
        "QUOTEDESK_LLM_PROVIDER",
        "QUOTEDESK_LLM_API_KEY",
        "QUOTEDESK_LLM_BASE_URL",
        "QUOTEDESK_LLM_MODEL",
        "QUOTEDESK_RENDER_TEMPLATE_PATH",
        "QUOTEDESK_RENDER_OUTPUT_DIR",
        "QUOTEDESK_RENDER_FORMAT",
        "QUOTEDESK_DELIVERY_TRANSPORTS",
        "QUOTEDESK_POSTMARK_SERVER_TOKEN",
        "QUOTEDESK_POSTMARK_FROM_ADDRESS",
        "QUOTEDESK_SMTP_HOST",
        "QUOTEDESK_SMTP_PASSWORD",
        "QUOTEDESK_OUTBOX_DIR",
        "QUOTEDESK_QUOTATION_SELLER_NAME",
        "QUOTEDESK_SERVER_PORT",
        "QUOTEDESK_LOGGING_LEVEL",
        "QUOTEDESK_LOG_LEVEL",
        "PORT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
