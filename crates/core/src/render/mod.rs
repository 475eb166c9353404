//! Quotation documents from Tera templates.
//!
//! The template is an external resource read on every render, so a template removed at runtime
//! surfaces as [`RenderFailure::TemplateNotFound`] on the next request instead of serving a
//! stale copy. Rendered documents are spooled to disk for the lifetime of a pipeline run and
//! deleted on [`RenderedDocument::release`] (or on drop).

pub mod pdf;

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::quotation::Quotation;
use crate::errors::RenderFailure;
use crate::money::{format_money, parse_amount, round_cents};

pub use pdf::PdfConverter;

const TEMPLATE_NAME: &str = "quotation.html";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Html,
    Pdf,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Pdf => "application/pdf",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererSettings {
    pub template_path: PathBuf,
    pub output_dir: PathBuf,
    pub format: DocumentFormat,
    pub seller_name: String,
    pub currency_symbol: String,
}

/// A filled-in quotation document. Owns its spool file until released.
#[derive(Debug)]
pub struct RenderedDocument {
    filename: String,
    format: DocumentFormat,
    bytes: Vec<u8>,
    spool_path: Option<PathBuf>,
}

impl RenderedDocument {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn spool_path(&self) -> Option<&Path> {
        self.spool_path.as_deref()
    }

    /// Deletes the spooled artifact. Safe to call when the file is already gone.
    pub fn release(mut self) -> std::io::Result<()> {
        match self.spool_path.take() {
            Some(path) => remove_spool(&path),
            None => Ok(()),
        }
    }
}

impl Drop for RenderedDocument {
    fn drop(&mut self) {
        if let Some(path) = self.spool_path.take() {
            if let Err(error) = remove_spool(&path) {
                warn!(path = %path.display(), error = %error, "could not remove spooled document");
            }
        }
    }
}

fn remove_spool(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(error) if error.kind() != ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

#[derive(Clone, Debug)]
pub struct DocumentRenderer {
    settings: RendererSettings,
    pdf: Option<PdfConverter>,
}

impl DocumentRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        let pdf = match settings.format {
            DocumentFormat::Pdf => {
                let converter = PdfConverter::locate();
                if converter.is_none() {
                    warn!("wkhtmltopdf not found in PATH - quotations will be delivered as html");
                }
                converter
            }
            DocumentFormat::Html => None,
        };
        Self { settings, pdf }
    }

    pub fn with_pdf_converter(mut self, converter: PdfConverter) -> Self {
        self.pdf = Some(converter);
        self
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Fills the template; the result depends only on the quotation and the template.
    pub fn render_html(&self, quotation: &Quotation) -> Result<String, RenderFailure> {
        let source = load_template(&self.settings.template_path)?;

        let mut tera = Tera::default();
        register_template_filters(&mut tera, &self.settings.currency_symbol);
        tera.add_raw_template(TEMPLATE_NAME, &source)
            .map_err(|error| RenderFailure::Render(describe(&error)))?;

        tera.render(TEMPLATE_NAME, &self.context(quotation))
            .map_err(|error| RenderFailure::Render(describe(&error)))
    }

    pub async fn render(&self, quotation: &Quotation) -> Result<RenderedDocument, RenderFailure> {
        self.render_on(quotation, chrono::Local::now().date_naive()).await
    }

    pub async fn render_on(
        &self,
        quotation: &Quotation,
        today: NaiveDate,
    ) -> Result<RenderedDocument, RenderFailure> {
        let html = self.render_html(quotation)?;

        let (format, bytes) = match &self.pdf {
            Some(converter) if self.settings.format == DocumentFormat::Pdf => {
                match converter.convert(&html).await {
                    Ok(pdf) => (DocumentFormat::Pdf, pdf),
                    Err(error) => {
                        warn!(error = %error, "pdf conversion failed, falling back to html");
                        (DocumentFormat::Html, html.into_bytes())
                    }
                }
            }
            _ => (DocumentFormat::Html, html.into_bytes()),
        };

        let filename = document_filename(quotation.customer_name(), today, format);
        let spool_path = self.spool(&filename, &bytes).await?;
        debug!(path = %spool_path.display(), size = bytes.len(), "quotation document spooled");

        Ok(RenderedDocument { filename, format, bytes, spool_path: Some(spool_path) })
    }

    async fn spool(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, RenderFailure> {
        let dir = &self.settings.output_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|error| RenderFailure::Spool(format!("{}: {error}", dir.display())))?;

        // Several requests for one customer on one day share a filename, so the spool copy is
        // prefixed to keep concurrent runs apart.
        let path = dir.join(format!("{}-{filename}", Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|error| RenderFailure::Spool(format!("{}: {error}", path.display())))?;
        Ok(path)
    }

    fn context(&self, quotation: &Quotation) -> Context {
        let mut rate_value = round_cents(quotation.rate());
        rate_value.rescale(2);
        let mut total_value = round_cents(quotation.total());
        total_value.rescale(2);

        let mut context = Context::new();
        context.insert("q_no", quotation.q_no());
        context.insert("date", &quotation.date_display());
        context.insert("company_name", quotation.company_name());
        context.insert("customer_name", quotation.customer_name());
        context.insert("product", quotation.product());
        context.insert("quantity", &quotation.quantity());
        context.insert("rate", quotation.rate_display());
        context.insert("units", quotation.units());
        context.insert("hsn", quotation.hsn());
        context.insert("email", quotation.email());
        context.insert("total", quotation.total_display());
        context.insert("rate_value", &rate_value.to_string());
        context.insert("total_value", &total_value.to_string());
        context.insert("seller_name", &self.settings.seller_name);
        context
    }
}

/// `Quotation_<customer>_<YYYY-MM-DD>.<ext>` with the customer name reduced to
/// `[A-Za-z0-9 _-]`.
pub fn document_filename(customer_name: &str, date: NaiveDate, format: DocumentFormat) -> String {
    let safe = customer_name
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, ' ' | '_' | '-'))
        .collect::<String>();
    let safe = match safe.trim() {
        "" => "Customer",
        trimmed => trimmed,
    };
    format!("Quotation_{safe}_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

fn load_template(path: &Path) -> Result<String, RenderFailure> {
    std::fs::read_to_string(path).map_err(|error| match error.kind() {
        ErrorKind::NotFound => RenderFailure::TemplateNotFound(path.to_path_buf()),
        _ => RenderFailure::Render(format!("could not read template {}: {error}", path.display())),
    })
}

/// Registers the `money` filter: `{{ rate_value | money }}` renders `₹600.00`.
pub fn register_template_filters(tera: &mut Tera, currency_symbol: &str) {
    let symbol = currency_symbol.to_owned();
    tera.register_filter(
        "money",
        move |value: &tera::Value, _args: &HashMap<String, tera::Value>| {
            let amount = match value {
                tera::Value::Number(number) => Decimal::from_str(&number.to_string()).ok(),
                tera::Value::String(text) => parse_amount(text),
                _ => None,
            }
            .ok_or_else(|| tera::Error::msg(format!("money filter cannot format `{value}`")))?;
            Ok(tera::Value::String(format_money(amount, &symbol)))
        },
    );
}

fn describe(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
