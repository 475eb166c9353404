use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

pub const LONG_DATE_FORMAT: &str = "%B %d, %Y";

/// A validated, priced enquiry. Only the normalizer can build one, so every instance has passed
/// the required-field, email and number checks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Quotation {
    customer_name: String,
    product: String,
    email: String,
    quantity: u32,
    rate: Decimal,
    units: String,
    q_no: String,
    company_name: String,
    hsn: String,
    date: NaiveDate,
    total: Decimal,
    rate_display: String,
    total_display: String,
}

#[derive(Clone, Debug)]
pub(crate) struct QuotationParts {
    pub customer_name: String,
    pub product: String,
    pub email: String,
    pub quantity: u32,
    pub rate: Decimal,
    pub total: Decimal,
    pub units: String,
    pub q_no: String,
    pub company_name: String,
    pub hsn: String,
    pub date: NaiveDate,
    pub currency_symbol: String,
}

impl Quotation {
    /// `parts.total` must already equal `quantity × rate`; the normalizer computes it with
    /// overflow checking.
    pub(crate) fn from_parts(parts: QuotationParts) -> Self {
        Self {
            rate_display: crate::money::format_money(parts.rate, &parts.currency_symbol),
            total_display: crate::money::format_money(parts.total, &parts.currency_symbol),
            customer_name: parts.customer_name,
            product: parts.product,
            email: parts.email,
            quantity: parts.quantity,
            rate: parts.rate,
            units: parts.units,
            q_no: parts.q_no,
            company_name: parts.company_name,
            hsn: parts.hsn,
            date: parts.date,
            total: parts.total,
        }
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    /// Reference number; empty when the enquiry carried none.
    pub fn q_no(&self) -> &str {
        &self.q_no
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn hsn(&self) -> &str {
        &self.hsn
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn date_display(&self) -> String {
        self.date.format(LONG_DATE_FORMAT).to_string()
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn rate_display(&self) -> &str {
        &self.rate_display
    }

    pub fn total_display(&self) -> &str {
        &self.total_display
    }
}
