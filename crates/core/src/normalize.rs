//! Candidate fields to a validated [`Quotation`].
//!
//! Pure: no I/O, and the processing date is injectable so results are reproducible.

use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::fields::{CandidateFields, FieldName};
use crate::domain::quotation::{Quotation, QuotationParts};
use crate::errors::ValidationFailure;
use crate::money::{parse_amount, DEFAULT_CURRENCY_SYMBOL};

pub const DEFAULT_UNITS: &str = "Nos";

const DATE_FORMATS: [&str; 6] =
    ["%B %d, %Y", "%B %d %Y", "%d %B %Y", "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizerSettings {
    pub default_units: String,
    pub currency_symbol: String,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            default_units: DEFAULT_UNITS.to_owned(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    settings: NormalizerSettings,
}

impl Normalizer {
    pub fn new(settings: NormalizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    pub fn normalize(&self, fields: &CandidateFields) -> Result<Quotation, ValidationFailure> {
        self.normalize_on(fields, Local::now().date_naive())
    }

    pub fn normalize_on(
        &self,
        fields: &CandidateFields,
        today: NaiveDate,
    ) -> Result<Quotation, ValidationFailure> {
        let required = check_required(fields)?;

        let units = match fields.units.trim() {
            "" => self.settings.default_units.clone(),
            units => units.to_owned(),
        };
        let date = parse_date(&fields.date).unwrap_or_else(|| {
            if !fields.date.trim().is_empty() {
                debug!(raw_date = %fields.date, "unrecognised quotation date; using today");
            }
            today
        });

        Ok(Quotation::from_parts(QuotationParts {
            customer_name: fields.customer_name.trim().to_owned(),
            product: fields.product.trim().to_owned(),
            email: required.email,
            quantity: required.quantity,
            rate: required.rate,
            total: required.total,
            units,
            q_no: fields.q_no.trim().to_owned(),
            company_name: fields.company_name.trim().to_owned(),
            hsn: fields.hsn.trim().to_owned(),
            date,
            currency_symbol: self.settings.currency_symbol.clone(),
        }))
    }
}

/// The five required fields after presence, email and number checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiredValues {
    pub email: String,
    pub quantity: u32,
    pub rate: Decimal,
    pub total: Decimal,
}

/// Checks the required fields in order (presence, email syntax, quantity, rate, total) without
/// building a [`Quotation`]. Extractors use it to reject unusable output early.
pub fn check_required(fields: &CandidateFields) -> Result<RequiredValues, ValidationFailure> {
    if let Some(missing) = fields.missing_required().into_iter().next() {
        return Err(ValidationFailure::MissingField(missing));
    }

    let email = fields.email.trim();
    if !is_valid_email(email) {
        return Err(ValidationFailure::InvalidEmail(email.to_owned()));
    }

    let quantity =
        parse_quantity(&fields.quantity).ok_or_else(|| ValidationFailure::InvalidNumber {
            field: FieldName::Quantity,
            value: fields.quantity.trim().to_owned(),
        })?;
    let invalid_rate = || ValidationFailure::InvalidNumber {
        field: FieldName::Rate,
        value: fields.rate.trim().to_owned(),
    };
    let rate = parse_amount(&fields.rate).ok_or_else(invalid_rate)?;
    let total = rate.checked_mul(Decimal::from(quantity)).ok_or_else(|| {
        debug!(quantity, rate = %rate, "quotation total overflows");
        invalid_rate()
    })?;

    Ok(RequiredValues { email: email.to_owned(), quantity, rate, total })
}

/// Integer part only; a fractional quantity other than `.0` is rejected.
pub fn parse_quantity(raw: &str) -> Option<u32> {
    let (whole, fraction) = raw.trim().split_once('.').unwrap_or((raw.trim(), ""));
    let fraction_digits = fraction.chars().take_while(char::is_ascii_digit).collect::<String>();
    if fraction_digits.chars().any(|digit| digit != '0') {
        return None;
    }

    let digits = whole.chars().filter(char::is_ascii_digit).collect::<String>();
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(quantity) => Some(quantity),
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS.iter().find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

pub fn is_valid_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || !local.chars().all(|ch| ch.is_ascii_alphanumeric() || "._%+-".contains(ch))
    {
        return false;
    }

    let labels = domain.split('.').collect::<Vec<_>>();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && tld.chars().all(|ch| ch.is_ascii_alphabetic())
}
