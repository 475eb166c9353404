use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::DEFAULT_CURRENCY_SYMBOL;
use crate::normalize::{NormalizerSettings, DEFAULT_UNITS};
use crate::render::{DocumentFormat, RendererSettings};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub quotation: QuotationConfig,
    pub render: RenderConfig,
    pub delivery: DeliveryConfig,
    pub whatsapp: WhatsAppConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct QuotationConfig {
    pub seller_name: String,
    pub signatory: String,
    pub currency_symbol: String,
    pub default_units: String,
}

#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub format: DocumentFormat,
}

#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    /// Priority order; the first transport to deliver wins.
    pub transports: Vec<TransportKind>,
    pub timeout_secs: u64,
    pub postmark: PostmarkConfig,
    pub smtp: SmtpConfig,
    pub outbox: OutboxConfig,
}

#[derive(Clone, Debug)]
pub struct PostmarkConfig {
    pub server_token: Option<SecretString>,
    pub from_address: Option<String>,
    pub api_base_url: String,
}

/// Authenticated SMTP relay. Port 465 uses implicit TLS; set `starttls` for 587-style relays.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from_address: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OutboxConfig {
    pub dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct WhatsAppConfig {
    pub access_token: Option<SecretString>,
    pub phone_number_id: Option<String>,
    pub verify_token: Option<SecretString>,
    pub app_secret: Option<SecretString>,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Postmark,
    Smtp,
    Outbox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_enabled: Option<bool>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub template_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub render_format: Option<DocumentFormat>,
    pub transports: Option<Vec<TransportKind>>,
    pub outbox_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                enabled: true,
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 20,
            },
            quotation: QuotationConfig {
                seller_name: "Quotedesk".to_string(),
                signatory: "Sales Team".to_string(),
                currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
                default_units: DEFAULT_UNITS.to_string(),
            },
            render: RenderConfig {
                template_path: PathBuf::from("templates/quotation.html.tera"),
                output_dir: PathBuf::from("var/spool"),
                format: DocumentFormat::Pdf,
            },
            delivery: DeliveryConfig {
                transports: vec![TransportKind::Outbox],
                timeout_secs: 30,
                postmark: PostmarkConfig {
                    server_token: None,
                    from_address: None,
                    api_base_url: "https://api.postmarkapp.com".to_string(),
                },
                smtp: SmtpConfig {
                    host: None,
                    port: 465,
                    starttls: false,
                    username: None,
                    password: None,
                    from_address: None,
                },
                outbox: OutboxConfig { dir: PathBuf::from("var/outbox") },
            },
            whatsapp: WhatsAppConfig {
                access_token: None,
                phone_number_id: None,
                verify_token: None,
                app_secret: None,
                api_base_url: "https://graph.facebook.com/v19.0".to_string(),
                timeout_secs: 20,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|gemini|ollama)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postmark" => Ok(Self::Postmark),
            "smtp" => Ok(Self::Smtp),
            "outbox" => Ok(Self::Outbox),
            other => Err(ConfigError::Validation(format!(
                "unsupported delivery transport `{other}` (expected postmark|smtp|outbox)"
            ))),
        }
    }
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postmark => "postmark",
            Self::Smtp => "smtp",
            Self::Outbox => "outbox",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

fn parse_document_format(key: &str, value: &str) -> Result<DocumentFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "html" => Ok(DocumentFormat::Html),
        "pdf" => Ok(DocumentFormat::Pdf),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("quotedesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn normalizer_settings(&self) -> NormalizerSettings {
        NormalizerSettings {
            default_units: self.quotation.default_units.clone(),
            currency_symbol: self.quotation.currency_symbol.clone(),
        }
    }

    pub fn renderer_settings(&self) -> RendererSettings {
        RendererSettings {
            template_path: self.render.template_path.clone(),
            output_dir: self.render.output_dir.clone(),
            format: self.render.format,
            seller_name: self.quotation.seller_name.clone(),
            currency_symbol: self.quotation.currency_symbol.clone(),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(enabled) = llm.enabled {
                self.llm.enabled = enabled;
            }
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(quotation) = patch.quotation {
            if let Some(seller_name) = quotation.seller_name {
                self.quotation.seller_name = seller_name;
            }
            if let Some(signatory) = quotation.signatory {
                self.quotation.signatory = signatory;
            }
            if let Some(currency_symbol) = quotation.currency_symbol {
                self.quotation.currency_symbol = currency_symbol;
            }
            if let Some(default_units) = quotation.default_units {
                self.quotation.default_units = default_units;
            }
        }

        if let Some(render) = patch.render {
            if let Some(template_path) = render.template_path {
                self.render.template_path = template_path;
            }
            if let Some(output_dir) = render.output_dir {
                self.render.output_dir = output_dir;
            }
            if let Some(format) = render.format {
                self.render.format = format;
            }
        }

        if let Some(delivery) = patch.delivery {
            if let Some(transports) = delivery.transports {
                self.delivery.transports = transports;
            }
            if let Some(timeout_secs) = delivery.timeout_secs {
                self.delivery.timeout_secs = timeout_secs;
            }
            if let Some(postmark) = delivery.postmark {
                if let Some(server_token) = postmark.server_token {
                    self.delivery.postmark.server_token = Some(secret_value(server_token));
                }
                if let Some(from_address) = postmark.from_address {
                    self.delivery.postmark.from_address = Some(from_address);
                }
                if let Some(api_base_url) = postmark.api_base_url {
                    self.delivery.postmark.api_base_url = api_base_url;
                }
            }
            if let Some(smtp) = delivery.smtp {
                if let Some(host) = smtp.host {
                    self.delivery.smtp.host = Some(host);
                }
                if let Some(port) = smtp.port {
                    self.delivery.smtp.port = port;
                }
                if let Some(starttls) = smtp.starttls {
                    self.delivery.smtp.starttls = starttls;
                }
                if let Some(username) = smtp.username {
                    self.delivery.smtp.username = Some(username);
                }
                if let Some(password) = smtp.password {
                    self.delivery.smtp.password = Some(secret_value(password));
                }
                if let Some(from_address) = smtp.from_address {
                    self.delivery.smtp.from_address = Some(from_address);
                }
            }
            if let Some(outbox) = delivery.outbox {
                if let Some(dir) = outbox.dir {
                    self.delivery.outbox.dir = dir;
                }
            }
        }

        if let Some(whatsapp) = patch.whatsapp {
            if let Some(access_token) = whatsapp.access_token {
                self.whatsapp.access_token = Some(secret_value(access_token));
            }
            if let Some(phone_number_id) = whatsapp.phone_number_id {
                self.whatsapp.phone_number_id = Some(phone_number_id);
            }
            if let Some(verify_token) = whatsapp.verify_token {
                self.whatsapp.verify_token = Some(secret_value(verify_token));
            }
            if let Some(app_secret) = whatsapp.app_secret {
                self.whatsapp.app_secret = Some(secret_value(app_secret));
            }
            if let Some(api_base_url) = whatsapp.api_base_url {
                self.whatsapp.api_base_url = api_base_url;
            }
            if let Some(timeout_secs) = whatsapp.timeout_secs {
                self.whatsapp.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("QUOTEDESK_LLM_ENABLED") {
            self.llm.enabled = parse_bool("QUOTEDESK_LLM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("QUOTEDESK_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEDESK_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("QUOTEDESK_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("QUOTEDESK_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("QUOTEDESK_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("QUOTEDESK_QUOTATION_SELLER_NAME") {
            self.quotation.seller_name = value;
        }
        if let Some(value) = read_env("QUOTEDESK_QUOTATION_SIGNATORY") {
            self.quotation.signatory = value;
        }
        if let Some(value) = read_env("QUOTEDESK_QUOTATION_CURRENCY_SYMBOL") {
            self.quotation.currency_symbol = value;
        }
        if let Some(value) = read_env("QUOTEDESK_QUOTATION_DEFAULT_UNITS") {
            self.quotation.default_units = value;
        }

        if let Some(value) = read_env("QUOTEDESK_RENDER_TEMPLATE_PATH") {
            self.render.template_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("QUOTEDESK_RENDER_OUTPUT_DIR") {
            self.render.output_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("QUOTEDESK_RENDER_FORMAT") {
            self.render.format = parse_document_format("QUOTEDESK_RENDER_FORMAT", &value)?;
        }

        if let Some(value) = read_env("QUOTEDESK_DELIVERY_TRANSPORTS") {
            self.delivery.transports = value
                .split(',')
                .filter(|item| !item.trim().is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()?;
        }
        if let Some(value) = read_env("QUOTEDESK_DELIVERY_TIMEOUT_SECS") {
            self.delivery.timeout_secs = parse_u64("QUOTEDESK_DELIVERY_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_POSTMARK_SERVER_TOKEN") {
            self.delivery.postmark.server_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEDESK_POSTMARK_FROM_ADDRESS") {
            self.delivery.postmark.from_address = Some(value);
        }
        if let Some(value) = read_env("QUOTEDESK_POSTMARK_API_BASE_URL") {
            self.delivery.postmark.api_base_url = value;
        }
        if let Some(value) = read_env("QUOTEDESK_SMTP_HOST") {
            self.delivery.smtp.host = Some(value);
        }
        if let Some(value) = read_env("QUOTEDESK_SMTP_PORT") {
            self.delivery.smtp.port = parse_u16("QUOTEDESK_SMTP_PORT", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_SMTP_STARTTLS") {
            self.delivery.smtp.starttls = parse_bool("QUOTEDESK_SMTP_STARTTLS", &value)?;
        }
        if let Some(value) = read_env("QUOTEDESK_SMTP_USERNAME") {
            self.delivery.smtp.username = Some(value);
        }
        if let Some(value) = read_env("QUOTEDESK_SMTP_PASSWORD") {
            self.delivery.smtp.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEDESK_SMTP_FROM_ADDRESS") {
            self.delivery.smtp.from_address = Some(value);
        }
        if let Some(value) = read_env("QUOTEDESK_OUTBOX_DIR") {
            self.delivery.outbox.dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("QUOTEDESK_WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEDESK_WHATSAPP_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = Some(value);
        }
        if let Some(value) = read_env("QUOTEDESK_WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEDESK_WHATSAPP_APP_SECRET") {
            self.whatsapp.app_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTEDESK_WHATSAPP_API_BASE_URL") {
            self.whatsapp.api_base_url = value;
        }
        if let Some(value) = read_env("QUOTEDESK_WHATSAPP_TIMEOUT_SECS") {
            self.whatsapp.timeout_secs = parse_u64("QUOTEDESK_WHATSAPP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("QUOTEDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("QUOTEDESK_SERVER_PORT").or_else(|| read_env("PORT"));
        if let Some(value) = port {
            self.server.port = parse_u16("QUOTEDESK_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("QUOTEDESK_LOGGING_LEVEL").or_else(|| read_env("QUOTEDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUOTEDESK_LOGGING_FORMAT").or_else(|| read_env("QUOTEDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.llm_enabled {
            self.llm.enabled = enabled;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(template_path) = overrides.template_path {
            self.render.template_path = template_path;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.render.output_dir = output_dir;
        }
        if let Some(format) = overrides.render_format {
            self.render.format = format;
        }
        if let Some(transports) = overrides.transports {
            self.delivery.transports = transports;
        }
        if let Some(dir) = overrides.outbox_dir {
            self.delivery.outbox.dir = dir;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_quotation(&self.quotation)?;
        validate_delivery(&self.delivery)?;
        validate_whatsapp(&self.whatsapp)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quotedesk.toml"), PathBuf::from("config/quotedesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_blank_secret(secret: Option<&SecretString>) -> bool {
    secret.map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true)
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if !llm.enabled {
        return Ok(());
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    let needs_key = matches!(llm.provider, LlmProvider::OpenAi | LlmProvider::Gemini);
    if needs_key && is_blank_secret(llm.api_key.as_ref()) {
        return Err(ConfigError::Validation(
            "llm.api_key is required for openai/gemini providers (or set llm.enabled = false to use rule-based extraction only)"
                .to_string(),
        ));
    }

    if let Some(base_url) = &llm.base_url {
        if !is_http_url(base_url) {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_quotation(quotation: &QuotationConfig) -> Result<(), ConfigError> {
    if quotation.seller_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "quotation.seller_name must not be empty".to_string(),
        ));
    }
    if quotation.default_units.trim().is_empty() {
        return Err(ConfigError::Validation(
            "quotation.default_units must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_delivery(delivery: &DeliveryConfig) -> Result<(), ConfigError> {
    if delivery.transports.is_empty() {
        return Err(ConfigError::Validation(
            "delivery.transports must name at least one transport (postmark|smtp|outbox)"
                .to_string(),
        ));
    }
    if delivery.timeout_secs == 0 || delivery.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "delivery.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if delivery.transports.contains(&TransportKind::Postmark) {
        let postmark = &delivery.postmark;
        if is_blank_secret(postmark.server_token.as_ref()) {
            return Err(ConfigError::Validation(
                "delivery.postmark.server_token is required when the postmark transport is enabled. Get it from your Postmark server > API Tokens"
                    .to_string(),
            ));
        }
        let from_missing =
            postmark.from_address.as_ref().map(|value| !value.contains('@')).unwrap_or(true);
        if from_missing {
            return Err(ConfigError::Validation(
                "delivery.postmark.from_address must be a sender signature email address"
                    .to_string(),
            ));
        }
        if !is_http_url(&postmark.api_base_url) {
            return Err(ConfigError::Validation(
                "delivery.postmark.api_base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if delivery.transports.contains(&TransportKind::Smtp) {
        let smtp = &delivery.smtp;
        let host_missing = smtp.host.as_deref().map(str::trim).unwrap_or_default().is_empty();
        if host_missing {
            return Err(ConfigError::Validation(
                "delivery.smtp.host is required when the smtp transport is enabled".to_string(),
            ));
        }
        if smtp.port == 0 {
            return Err(ConfigError::Validation("delivery.smtp.port must be non-zero".to_string()));
        }
        let username_missing =
            smtp.username.as_deref().map(str::trim).unwrap_or_default().is_empty();
        if username_missing || is_blank_secret(smtp.password.as_ref()) {
            return Err(ConfigError::Validation(
                "delivery.smtp.username and delivery.smtp.password are required when the smtp transport is enabled"
                    .to_string(),
            ));
        }
        let from_missing =
            smtp.from_address.as_ref().map(|value| !value.contains('@')).unwrap_or(true);
        if from_missing {
            return Err(ConfigError::Validation(
                "delivery.smtp.from_address must be an email address".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_whatsapp(whatsapp: &WhatsAppConfig) -> Result<(), ConfigError> {
    if !is_http_url(&whatsapp.api_base_url) {
        return Err(ConfigError::Validation(
            "whatsapp.api_base_url must start with http:// or https://".to_string(),
        ));
    }
    if whatsapp.timeout_secs == 0 || whatsapp.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "whatsapp.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    let has_token = !is_blank_secret(whatsapp.access_token.as_ref());
    let has_phone = whatsapp.phone_number_id.as_ref().is_some_and(|id| !id.trim().is_empty());
    if has_token != has_phone {
        return Err(ConfigError::Validation(
            "whatsapp.access_token and whatsapp.phone_number_id must be configured together"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    quotation: Option<QuotationPatch>,
    render: Option<RenderPatch>,
    delivery: Option<DeliveryPatch>,
    whatsapp: Option<WhatsAppPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    enabled: Option<bool>,
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotationPatch {
    seller_name: Option<String>,
    signatory: Option<String>,
    currency_symbol: Option<String>,
    default_units: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderPatch {
    template_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    format: Option<DocumentFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct DeliveryPatch {
    transports: Option<Vec<TransportKind>>,
    timeout_secs: Option<u64>,
    postmark: Option<PostmarkPatch>,
    smtp: Option<SmtpPatch>,
    outbox: Option<OutboxPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PostmarkPatch {
    server_token: Option<String>,
    from_address: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SmtpPatch {
    host: Option<String>,
    port: Option<u16>,
    starttls: Option<bool>,
    username: Option<String>,
    password: Option<String>,
    from_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutboxPatch {
    dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct WhatsAppPatch {
    access_token: Option<String>,
    phone_number_id: Option<String>,
    verify_token: Option<String>,
    app_secret: Option<String>,
    api_base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
        TransportKind,
    };
    use crate::render::DocumentFormat;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, contents: &str) -> Result<PathBuf, String> {
        let path = dir.path().join("quotedesk.toml");
        fs::write(&path, contents).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn defaults_load_without_a_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/quotedesk.toml")),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.llm.provider == LlmProvider::Ollama, "default provider should be ollama")?;
        ensure(
            config.delivery.transports == vec![TransportKind::Outbox],
            "default transport should be the outbox",
        )?;
        ensure(config.quotation.default_units == "Nos", "default units should be Nos")?;
        ensure(config.quotation.currency_symbol == "₹", "default currency should be rupees")?;
        ensure(config.render.format == DocumentFormat::Pdf, "default format should be pdf")?;
        Ok(())
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/quotedesk.toml")),
            require_file: true,
            ..LoadOptions::default()
        });
        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should be reported",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_POSTMARK_TOKEN", "pm-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[delivery]
transports = ["postmark", "outbox"]

[delivery.postmark]
server_token = "${TEST_POSTMARK_TOKEN}"
from_address = "sales@example.com"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let token = config
                .delivery
                .postmark
                .server_token
                .as_ref()
                .map(|token| token.expose_secret().to_string());
            ensure(
                token.as_deref() == Some("pm-from-env"),
                "postmark token should be loaded from environment",
            )?;
            ensure(
                config.delivery.transports
                    == vec![TransportKind::Postmark, TransportKind::Outbox],
                "transport priority should follow the file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_POSTMARK_TOKEN"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[llm]\napi_key = \"${QUOTEDESK_TEST_UNSET_VAR}\"\n")?;

        let result =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(
                result,
                Err(ConfigError::MissingEnvInterpolation { ref var })
                    if var == "QUOTEDESK_TEST_UNSET_VAR"
            ),
            "unset interpolation variable should be named",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_LOG_LEVEL", "warn");
        env::set_var("QUOTEDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["QUOTEDESK_LOG_LEVEL", "QUOTEDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_QUOTATION_SELLER_NAME", "Env Metals");
        env::set_var("QUOTEDESK_LLM_MODEL", "model-from-env");
        env::set_var("QUOTEDESK_DELIVERY_TRANSPORTS", "outbox");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[llm]
model = "model-from-file"

[quotation]
seller_name = "File Metals"
default_units = "Kgs"

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    llm_model: Some("model-from-override".to_string()),
                    log_level: Some("debug".to_string()),
                    render_format: Some(DocumentFormat::Html),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.model == "model-from-override", "override model should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.quotation.seller_name == "Env Metals",
                "env seller name should win over file and defaults",
            )?;
            ensure(config.quotation.default_units == "Kgs", "file units should win over default")?;
            ensure(config.render.format == DocumentFormat::Html, "override format should win")?;
            Ok(())
        })();

        clear_vars(&[
            "QUOTEDESK_QUOTATION_SELLER_NAME",
            "QUOTEDESK_LLM_MODEL",
            "QUOTEDESK_DELIVERY_TRANSPORTS",
        ]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_LLM_PROVIDER", "gemini");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["QUOTEDESK_LLM_PROVIDER"]);
        result
    }

    #[test]
    fn disabled_llm_needs_no_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_LLM_PROVIDER", "openai");
        env::set_var("QUOTEDESK_LLM_ENABLED", "false");

        let result = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))
            .and_then(|config| ensure(!config.llm.enabled, "llm should be disabled"));

        clear_vars(&["QUOTEDESK_LLM_PROVIDER", "QUOTEDESK_LLM_ENABLED"]);
        result
    }

    #[test]
    fn postmark_transport_requires_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                transports: Some(vec![TransportKind::Postmark]),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });
        ensure(
            matches!(
                result,
                Err(ConfigError::Validation(ref message))
                    if message.contains("delivery.postmark.server_token")
            ),
            "postmark without a token should fail validation",
        )
    }

    #[test]
    fn smtp_transport_loads_from_file_and_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_SMTP_PASSWORD", "app-password");
        env::set_var("QUOTEDESK_SMTP_PORT", "587");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[delivery]
transports = ["smtp", "outbox"]

[delivery.smtp]
host = "smtp.zoho.in"
starttls = true
username = "sales@example.com"
from_address = "sales@example.com"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;
            let smtp = &config.delivery.smtp;
            ensure(smtp.host.as_deref() == Some("smtp.zoho.in"), "file host should be used")?;
            ensure(smtp.port == 587, "env port should win over the default")?;
            ensure(smtp.starttls, "file starttls flag should be used")?;
            ensure(
                smtp.password.as_ref().map(|value| value.expose_secret() == "app-password")
                    == Some(true),
                "env password should be loaded",
            )?;
            ensure(
                config.delivery.transports == vec![TransportKind::Smtp, TransportKind::Outbox],
                "transports should keep file order",
            )
        })();

        clear_vars(&["QUOTEDESK_SMTP_PASSWORD", "QUOTEDESK_SMTP_PORT"]);
        result
    }

    #[test]
    fn smtp_transport_requires_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_SMTP_HOST", "smtp.example.com");
        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                transports: Some(vec![TransportKind::Smtp]),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });
        clear_vars(&["QUOTEDESK_SMTP_HOST"]);

        ensure(
            matches!(
                result,
                Err(ConfigError::Validation(ref message)) if message.contains("delivery.smtp.username")
            ),
            "smtp without credentials should fail validation",
        )
    }

    #[test]
    fn invalid_env_values_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_SERVER_PORT", "eighty");
        let port = AppConfig::load(LoadOptions::default());
        clear_vars(&["QUOTEDESK_SERVER_PORT"]);

        env::set_var("QUOTEDESK_DELIVERY_TRANSPORTS", "outbox,carrier-pigeon");
        let transports = AppConfig::load(LoadOptions::default());
        clear_vars(&["QUOTEDESK_DELIVERY_TRANSPORTS"]);

        ensure(
            matches!(port, Err(ConfigError::InvalidEnvOverride { ref key, .. }) if key == "QUOTEDESK_SERVER_PORT"),
            "non-numeric port should be rejected",
        )?;
        ensure(
            matches!(transports, Err(ConfigError::Validation(ref message)) if message.contains("carrier-pigeon")),
            "unknown transport should be rejected",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUOTEDESK_WHATSAPP_ACCESS_TOKEN", "wa-secret-value");
        env::set_var("QUOTEDESK_WHATSAPP_PHONE_NUMBER_ID", "1234567890");
        env::set_var("QUOTEDESK_WHATSAPP_APP_SECRET", "app-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("wa-secret-value"),
                "debug output should not contain the access token",
            )?;
            ensure(
                !debug.contains("app-secret-value"),
                "debug output should not contain the app secret",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&[
            "QUOTEDESK_WHATSAPP_ACCESS_TOKEN",
            "QUOTEDESK_WHATSAPP_PHONE_NUMBER_ID",
            "QUOTEDESK_WHATSAPP_APP_SECRET",
        ]);
        result
    }
}
