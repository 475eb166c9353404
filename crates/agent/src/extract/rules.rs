//! Label-scanning fallback extractor. Needs no external service and never fails.

use std::sync::LazyLock;

use async_trait::async_trait;
use quotedesk_core::domain::fields::{CandidateFields, FieldName};
use quotedesk_core::errors::ExtractionFailure;
use regex::Regex;

use crate::extract::FieldExtractor;

/// Longer aliases come first so `customer name` wins over `name` at the same position.
const LABEL_ALIASES: &[(&str, FieldName)] = &[
    ("customer name", FieldName::CustomerName),
    ("company name", FieldName::CompanyName),
    ("quotation no", FieldName::QNo),
    ("quote no", FieldName::QNo),
    ("hsn code", FieldName::Hsn),
    ("customer", FieldName::CustomerName),
    ("company", FieldName::CompanyName),
    ("quantity", FieldName::Quantity),
    ("product", FieldName::Product),
    ("e-mail", FieldName::Email),
    ("person", FieldName::CustomerName),
    ("price", FieldName::Rate),
    ("units", FieldName::Units),
    ("email", FieldName::Email),
    ("q_no", FieldName::QNo),
    ("q no", FieldName::QNo),
    ("name", FieldName::CustomerName),
    ("item", FieldName::Product),
    ("rate", FieldName::Rate),
    ("unit", FieldName::Units),
    ("date", FieldName::Date),
    ("mail", FieldName::Email),
    ("qty", FieldName::Quantity),
    ("uom", FieldName::Units),
    ("hsn", FieldName::Hsn),
    ("ref", FieldName::QNo),
];

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = LABEL_ALIASES
        .iter()
        .map(|(alias, _)| regex::escape(alias).replace(' ', r"[ \t]+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?im)(?:^|[\s,;|])({alternatives})\.?[ \t]*[:=][ \t]*"))
        .expect("label pattern is a valid regex")
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:,\d+)*(?:\.\d+)?").expect("number pattern is a valid regex")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("word pattern is a valid regex"));

static ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9A-Za-z]+").expect("token pattern is a valid regex"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("email pattern is a valid regex")
});

#[derive(Clone, Copy, Debug, Default)]
pub struct RuleExtractor;

impl RuleExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_fields(&self, text: &str) -> CandidateFields {
        let mut fields = CandidateFields::default();

        for (field, raw_value) in labelled_values(text) {
            if !fields.is_blank(field) {
                continue;
            }
            if let Some(value) = refine(field, raw_value) {
                fields.set(field, value);
            }
        }

        if fields.is_blank(FieldName::Email) {
            if let Some(address) = EMAIL.find(text) {
                fields.set(FieldName::Email, address.as_str());
            }
        }

        fields
    }
}

#[async_trait]
impl FieldExtractor for RuleExtractor {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn extract(&self, text: &str) -> Result<CandidateFields, ExtractionFailure> {
        Ok(self.extract_fields(text))
    }
}

/// Every `label: value` pair in order of appearance. A value stops at the end of its line, at
/// `;` or `|`, or where the next label on the same line begins.
fn labelled_values(text: &str) -> Vec<(FieldName, &str)> {
    let labels = LABEL
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let alias = captures.get(1)?;
            let field = field_for_alias(alias.as_str())?;
            Some((field, alias.start(), whole.end()))
        })
        .collect::<Vec<_>>();

    labels
        .iter()
        .enumerate()
        .map(|(index, &(field, _, value_start))| {
            let rest = &text[value_start..];
            let mut end = rest.find(['\n', '\r', ';', '|']).unwrap_or(rest.len());
            if let Some(&(_, next_label_start, _)) = labels.get(index + 1) {
                end = end.min(next_label_start.saturating_sub(value_start));
            }
            (field, &rest[..end])
        })
        .collect()
}

fn field_for_alias(alias: &str) -> Option<FieldName> {
    let normalized = alias.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
    LABEL_ALIASES.iter().find(|(candidate, _)| *candidate == normalized).map(|(_, field)| *field)
}

fn refine(field: FieldName, raw_value: &str) -> Option<String> {
    let value = raw_value.trim().trim_end_matches(',').trim();
    let refined = match field {
        FieldName::Quantity | FieldName::Rate => NUMBER.find(value)?.as_str(),
        FieldName::Units => WORD.find(value)?.as_str(),
        FieldName::Hsn => ALPHANUMERIC.find(value)?.as_str(),
        FieldName::Email => EMAIL.find(value)?.as_str(),
        _ => value,
    };
    (!refined.is_empty()).then(|| refined.to_owned())
}
