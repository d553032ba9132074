use std::fmt;

/// Money is an integer count of the currency's smallest unit.
/// VND has no minor unit, so 50000 is 50 000 ₫.
pub type Amount = i64;

/// Largest amount a single transaction may carry.
pub const MAX_AMOUNT: Amount = 1_000_000_000_000_000;

/// Format an amount with thousands separators.
/// Example: 50000 -> "50,000", -1234567 -> "-1,234,567"
pub fn format_amount(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if amount < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Parse a user or spreadsheet amount into minor units.
///
/// Accepts grouping separators (`50,000`, `50 000`, `50_000`) and the
/// float-looking cells spreadsheets hand back (`50000.0`). A fractional part
/// is rounded half away from zero: `12.5` -> 13.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' ' | '\u{a0}'))
        .collect();

    if cleaned.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (negative, unsigned) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(cleaned.as_str())),
    };

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseAmountError::InvalidFormat);
    }

    let mut value: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseAmountError::Overflow)?
    };

    if fraction.chars().next().is_some_and(|c| c >= '5') {
        value = value.checked_add(1).ok_or(ParseAmountError::Overflow)?;
    }

    Ok(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "empty amount"),
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
            ParseAmountError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseAmountError {}
