//! Fixed-point conversion between human decimal amounts and token base units.
//!
//! All arithmetic happens on decimal strings and [`U256`]; binary floating
//! point is never involved, so 18-decimal tokens convert exactly.
//!
//! ```text
//! to_base_units("1.5", 6)  = 1_500_000
//! to_human(1_500_000, 6)   = "1.5"
//! ```

use alloy_primitives::U256;

/// Syntax-check a human amount without knowing the token's decimals.
///
/// Accepts unsigned decimal literals such as `"10"`, `"0.25"`, `".5"` and
/// `"3."`. Returns the trimmed literal on success.
pub fn check_human(human: &str) -> Result<&str, AmountError> {
    let trimmed = human.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Missing);
    }

    let (whole, frac) = split_decimal(trimmed)?;
    let is_zero = whole.bytes().chain(frac.bytes()).all(|b| b == b'0');
    if is_zero {
        return Err(AmountError::NotPositive);
    }

    Ok(trimmed)
}

/// Convert a human decimal amount to base units for a token with `decimals`.
///
/// Rejects amounts with more fractional digits than the token supports rather
/// than silently truncating them.
pub fn to_base_units(human: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = check_human(human)?;
    let (whole, frac) = split_decimal(trimmed)?;

    let scale = decimals as usize;
    // Trailing fractional zeros carry no value, so "1.500" fits 2 decimals.
    let frac = frac.trim_end_matches('0');
    if frac.len() > scale {
        return Err(AmountError::ExcessPrecision { decimals });
    }

    let mut digits = String::with_capacity(whole.len() + scale);
    digits.push_str(whole);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(scale - frac.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Err(AmountError::NotPositive);
    }

    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow)
}

/// Render base units as a canonical human decimal string.
///
/// Canonical form has no leading zeros in the integer part (other than a
/// single `0`), no trailing fractional zeros and no trailing `.`.
pub fn to_human(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let scale = decimals as usize;

    if scale == 0 {
        return digits;
    }

    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };

    let (whole, frac) = padded.split_at(padded.len() - scale);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

/// Sum base-unit amounts with overflow checking.
pub fn sum_base_units<I>(amounts: I) -> Result<U256, AmountError>
where
    I: IntoIterator<Item = U256>,
{
    amounts
        .into_iter()
        .try_fold(U256::ZERO, |acc, amount| {
            acc.checked_add(amount).ok_or(AmountError::Overflow)
        })
}

/// Exact decimal sum of human amounts, rendered canonically.
///
/// The scale is the largest number of fractional digits among the inputs, so
/// no precision is lost. Every amount must be a positive decimal literal.
pub fn sum_human<'a, I>(amounts: I) -> Result<String, AmountError>
where
    I: IntoIterator<Item = &'a str>,
{
    let amounts: Vec<&str> = amounts.into_iter().collect();

    let mut scale = 0usize;
    for amount in &amounts {
        let (_, frac) = split_decimal(check_human(amount)?)?;
        scale = scale.max(frac.trim_end_matches('0').len());
    }
    let scale = u8::try_from(scale).map_err(|_| AmountError::Overflow)?;

    let total = amounts
        .iter()
        .map(|amount| to_base_units(amount, scale))
        .collect::<Result<Vec<_>, _>>()
        .and_then(sum_base_units)?;

    Ok(to_human(total, scale))
}

/// Split a literal into its integer and fractional digit strings.
fn split_decimal(literal: &str) -> Result<(&str, &str), AmountError> {
    let (whole, frac) = match literal.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (literal, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(AmountError::NotNumeric(literal.to_string()));
    }

    Ok((whole, frac))
}

/// Errors from parsing or converting an amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount is missing")]
    Missing,

    #[error("Amount is not a number: {0}")]
    NotNumeric(String),

    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("Amount has more than {decimals} fractional digits")]
    ExcessPrecision {
        /// Decimal places supported by the token.
        decimals: u8,
    },

    #[error("Amount does not fit in 256 bits")]
    Overflow,
}
