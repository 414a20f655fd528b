use thiserror::Error;

/// Balances and fees are stored as integer cents so that fees moving
/// between users are conserved exactly. 1 unit = 100 cents.
pub type Cents = i64;

const CENTS_PER_UNIT: i64 = 100;

/// Render cents as a decimal amount, e.g. 99050 -> "990.50".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        abs / CENTS_PER_UNIT as u64,
        abs % CENTS_PER_UNIT as u64
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid money format: {0}")]
    InvalidFormat(String),

    #[error("amount has more than two decimal places: {0}")]
    TooPrecise(String),

    #[error("amount out of range: {0}")]
    OutOfRange(String),
}

/// Parse a decimal amount into cents.
///
/// Accepts an optional sign, whole units and up to two decimal places:
/// "10" -> 1000, "10.5" -> 1050, "-0.01" -> -1, ".25" -> 25.
/// Amounts with finer precision are rejected rather than rounded.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (units_str, fraction_str) = digits.split_once('.').unwrap_or((digits, ""));
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if (units_str.is_empty() && fraction_str.is_empty())
        || !all_digits(units_str)
        || !all_digits(fraction_str)
    {
        return Err(ParseCentsError::InvalidFormat(trimmed.to_string()));
    }
    if fraction_str.len() > 2 {
        return Err(ParseCentsError::TooPrecise(trimmed.to_string()));
    }

    let out_of_range = || ParseCentsError::OutOfRange(trimmed.to_string());

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| out_of_range())?
    };
    let fraction: i64 = match fraction_str.len() {
        0 => 0,
        1 => fraction_str.parse::<i64>().map_err(|_| out_of_range())? * 10,
        _ => fraction_str.parse().map_err(|_| out_of_range())?,
    };

    let cents = units
        .checked_mul(CENTS_PER_UNIT)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(out_of_range)?;

    Ok(if negative { -cents } else { cents })
}
