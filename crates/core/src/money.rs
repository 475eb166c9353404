use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats `amount` as `<symbol>1,234,567.89`.
pub fn format_money(amount: Decimal, symbol: &str) -> String {
    let mut rounded = round_cents(amount);
    rounded.rescale(2);

    let rendered = rounded.abs().to_string();
    let (whole, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };

    format!("{sign}{symbol}{}.{fraction}", group_thousands(whole))
}

/// Reads an amount back from free text or a formatted string: thousands separators, currency
/// symbols and letters are dropped, digits and the decimal point are kept.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned = text.chars().filter(|ch| ch.is_ascii_digit() || *ch == '.').collect::<String>();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
