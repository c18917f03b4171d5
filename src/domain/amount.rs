//! Fixed-point money values.
//!
//! Amounts are held as integer cents. Every conversion from user input or from the wire
//! rounds to two decimals half away from zero, so `12.345` becomes `12.35` and sums of
//! stored amounts never need rounding again.

use std::{fmt, iter::Sum, ops::Neg};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Largest magnitude (in cents) that survives a round trip through an IEEE double.
const MAX_CENTS: i64 = 9_007_199_254_740_991;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Parses user input such as `"12.5"`, `" 40 "` or `"1e3"`.
    ///
    /// Returns `None` for anything that is not a finite number.
    pub fn parse(input: &str) -> Option<Amount> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(amount) = parse_decimal(trimmed) {
            return Some(amount);
        }
        if !trimmed
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
        {
            return None;
        }
        trimmed.parse::<f64>().ok().and_then(Amount::from_f64)
    }

    pub fn from_f64(value: f64) -> Option<Amount> {
        if !value.is_finite() {
            return None;
        }
        // `Display` yields the shortest decimal that round-trips, so the same exact
        // rounding applies to wire values as to typed input.
        parse_decimal(&value.to_string())
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn abs(self) -> Amount {
        Amount(self.0.saturating_abs())
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Renders with thousands grouping; negatives carry a leading `- `.
    pub fn format_grouped(self) -> String {
        let magnitude = self.0.unsigned_abs();
        let body = format!(
            "{}.{:02}",
            group_digits(&(magnitude / 100).to_string(), ','),
            magnitude % 100
        );
        if self.is_negative() {
            format!("- {body}")
        } else {
            body
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount(self.0.saturating_neg())
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Amount::from_f64(value),
            Raw::Text(text) => Amount::parse(&text),
        };
        parsed.ok_or_else(|| serde::de::Error::custom("amount is not a finite number"))
    }
}

/// Exact decimal parsing for plain `[-+]digits[.digits]` input.
fn parse_decimal(input: &str) -> Option<Amount> {
    let (negative, digits) = match input.as_bytes().first()? {
        b'-' => (true, &input[1..]),
        b'+' => (false, &input[1..]),
        _ => (false, input),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let whole = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().ok()?
    };
    let digit = |index: usize| {
        fraction
            .as_bytes()
            .get(index)
            .map_or(0, |b| i64::from(b - b'0'))
    };
    let mut cents = whole.checked_mul(100)?.checked_add(digit(0) * 10 + digit(1))?;
    if digit(2) >= 5 {
        cents = cents.checked_add(1)?;
    }
    if cents > MAX_CENTS {
        return None;
    }
    Some(Amount(if negative { -cents } else { cents }))
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index != 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}
