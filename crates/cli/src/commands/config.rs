use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use quotedesk_core::config::{AppConfig, LoadOptions};
use secrecy::SecretString;
use toml::Value;

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config),
        Err(error) => format!("config validation failed: {error}"),
    }
}

/// Effective values with their source, secrets redacted.
pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let transports =
        config.delivery.transports.iter().map(|kind| kind.as_str()).collect::<Vec<_>>().join(",");

    let entries = vec![
        entry("llm.enabled", &["QUOTEDESK_LLM_ENABLED"], config.llm.enabled.to_string()),
        entry(
            "llm.provider",
            &["QUOTEDESK_LLM_PROVIDER"],
            config.llm.provider.as_str().to_string(),
        ),
        entry("llm.model", &["QUOTEDESK_LLM_MODEL"], config.llm.model.clone()),
        entry(
            "llm.base_url",
            &["QUOTEDESK_LLM_BASE_URL"],
            config.llm.base_url.clone().unwrap_or_else(|| "<provider default>".to_string()),
        ),
        entry("llm.api_key", &["QUOTEDESK_LLM_API_KEY"], redact(config.llm.api_key.as_ref())),
        entry(
            "llm.timeout_secs",
            &["QUOTEDESK_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        entry(
            "quotation.seller_name",
            &["QUOTEDESK_QUOTATION_SELLER_NAME"],
            config.quotation.seller_name.clone(),
        ),
        entry(
            "quotation.signatory",
            &["QUOTEDESK_QUOTATION_SIGNATORY"],
            config.quotation.signatory.clone(),
        ),
        entry(
            "quotation.currency_symbol",
            &["QUOTEDESK_QUOTATION_CURRENCY_SYMBOL"],
            config.quotation.currency_symbol.clone(),
        ),
        entry(
            "quotation.default_units",
            &["QUOTEDESK_QUOTATION_DEFAULT_UNITS"],
            config.quotation.default_units.clone(),
        ),
        entry(
            "render.template_path",
            &["QUOTEDESK_RENDER_TEMPLATE_PATH"],
            config.render.template_path.display().to_string(),
        ),
        entry(
            "render.output_dir",
            &["QUOTEDESK_RENDER_OUTPUT_DIR"],
            config.render.output_dir.display().to_string(),
        ),
        entry(
            "render.format",
            &["QUOTEDESK_RENDER_FORMAT"],
            config.render.format.extension().to_string(),
        ),
        entry("delivery.transports", &["QUOTEDESK_DELIVERY_TRANSPORTS"], transports),
        entry(
            "delivery.timeout_secs",
            &["QUOTEDESK_DELIVERY_TIMEOUT_SECS"],
            config.delivery.timeout_secs.to_string(),
        ),
        entry(
            "delivery.postmark.server_token",
            &["QUOTEDESK_POSTMARK_SERVER_TOKEN"],
            redact(config.delivery.postmark.server_token.as_ref()),
        ),
        entry(
            "delivery.postmark.from_address",
            &["QUOTEDESK_POSTMARK_FROM_ADDRESS"],
            config.delivery.postmark.from_address.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry(
            "delivery.smtp.host",
            &["QUOTEDESK_SMTP_HOST"],
            config.delivery.smtp.host.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry(
            "delivery.smtp.port",
            &["QUOTEDESK_SMTP_PORT"],
            config.delivery.smtp.port.to_string(),
        ),
        entry(
            "delivery.smtp.starttls",
            &["QUOTEDESK_SMTP_STARTTLS"],
            config.delivery.smtp.starttls.to_string(),
        ),
        entry(
            "delivery.smtp.username",
            &["QUOTEDESK_SMTP_USERNAME"],
            config.delivery.smtp.username.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry(
            "delivery.smtp.password",
            &["QUOTEDESK_SMTP_PASSWORD"],
            redact(config.delivery.smtp.password.as_ref()),
        ),
        entry(
            "delivery.smtp.from_address",
            &["QUOTEDESK_SMTP_FROM_ADDRESS"],
            config.delivery.smtp.from_address.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry(
            "delivery.outbox.dir",
            &["QUOTEDESK_OUTBOX_DIR"],
            config.delivery.outbox.dir.display().to_string(),
        ),
        entry(
            "whatsapp.access_token",
            &["QUOTEDESK_WHATSAPP_ACCESS_TOKEN"],
            redact(config.whatsapp.access_token.as_ref()),
        ),
        entry(
            "whatsapp.phone_number_id",
            &["QUOTEDESK_WHATSAPP_PHONE_NUMBER_ID"],
            config.whatsapp.phone_number_id.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        entry(
            "whatsapp.verify_token",
            &["QUOTEDESK_WHATSAPP_VERIFY_TOKEN"],
            redact(config.whatsapp.verify_token.as_ref()),
        ),
        entry(
            "whatsapp.app_secret",
            &["QUOTEDESK_WHATSAPP_APP_SECRET"],
            redact(config.whatsapp.app_secret.as_ref()),
        ),
        entry(
            "server.bind_address",
            &["QUOTEDESK_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        entry("server.port", &["QUOTEDESK_SERVER_PORT", "PORT"], config.server.port.to_string()),
        entry(
            "logging.level",
            &["QUOTEDESK_LOGGING_LEVEL", "QUOTEDESK_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        entry(
            "logging.format",
            &["QUOTEDESK_LOGGING_FORMAT", "QUOTEDESK_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_lowercase(),
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, env_keys, value) in entries {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }
    lines.join("\n")
}

fn entry(
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
) -> (&'static str, &'static [&'static str], String) {
    (key, env_keys, value)
}

fn detect_config_path() -> Option<PathBuf> {
    ["quotedesk.toml", "config/quotedesk.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|env_key| env::var_os(env_key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact(secret: Option<&SecretString>) -> String {
    match secret {
        Some(_) => "<redacted>".to_string(),
        None => "<unset>".to_string(),
    }
}
