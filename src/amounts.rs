//! Exact BNB ↔ wei conversion.
//!
//! All financial amounts cross the backend wire as wei-encoded integer
//! strings. Conversions run on `rust_decimal` so no binary floating point
//! touches the multiplication or division step; floats appear nowhere,
//! and display rounding happens only at format time.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::AmountError;

/// Number of decimal places between BNB and wei (10^18 wei per BNB).
pub const WEI_SCALE: u32 = 18;

fn wei_per_bnb() -> Decimal {
    Decimal::from(1_000_000_000_000_000_000u64)
}

/// Parse a user-supplied decimal amount, e.g. `"0.05"`.
pub fn parse_bnb(text: &str) -> Result<Decimal, AmountError> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed).map_err(|_| AmountError::Unparseable(trimmed.to_string()))
}

/// Convert a BNB amount to a wei string, truncating any fraction of a wei.
pub fn bnb_to_wei(amount: Decimal) -> Result<String, AmountError> {
    if amount.is_sign_negative() {
        return Err(AmountError::Negative(amount.to_string()));
    }
    let wei = amount
        .checked_mul(wei_per_bnb())
        .ok_or_else(|| AmountError::OutOfRange(amount.to_string()))?;
    Ok(wei.trunc().normalize().to_string())
}

/// Convert a wei string back to a BNB amount. Exact inverse of
/// [`bnb_to_wei`] for amounts with up to 18 fractional digits.
pub fn wei_to_bnb(wei: &str) -> Result<Decimal, AmountError> {
    let trimmed = wei.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::BadSubunits(trimmed.to_string()));
    }
    let value: i128 = trimmed
        .parse()
        .map_err(|_| AmountError::BadSubunits(trimmed.to_string()))?;
    Decimal::try_from_i128_with_scale(value, WEI_SCALE)
        .map_err(|_| AmountError::OutOfRange(trimmed.to_string()))
}

/// Numeric value of a wei string, for bound comparisons.
pub fn wei_value(wei: &str) -> Result<u128, AmountError> {
    let trimmed = wei.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::BadSubunits(trimmed.to_string()));
    }
    trimmed
        .parse()
        .map_err(|_| AmountError::OutOfRange(trimmed.to_string()))
}

/// Format a BNB amount for the config view (4 decimal places).
pub fn format_bnb(amount: &Decimal) -> String {
    format!("{:.4}", amount)
}

/// Format a wallet balance (3 decimal places, matching deposit prompts).
pub fn format_balance(amount: &Decimal) -> String {
    format!("{:.3}", amount)
}

/// Format a millisecond delay as seconds with one decimal place.
pub fn format_delay_secs(delay_millis: u64) -> String {
    let secs = Decimal::from(delay_millis) / Decimal::from(1000u32);
    format!("{:.1}", secs)
}
