use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer minor units** (kopecks).
///
/// Every balance, cost and history amount in the engine goes through this
/// type, so no floating-point value is ever stored.
///
/// # Examples
///
/// ```rust
/// use engine::Amount;
///
/// let amount = Amount::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// assert_eq!("10,5".parse::<Amount>().unwrap().minor(), 1050);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Validates an amount coming from a command: it must be strictly positive.
    pub(crate) fn positive(minor: i64, label: &str) -> Result<Self, EngineError> {
        if minor <= 0 {
            return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
        }
        Ok(Self(minor))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Amount> for i64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl FromStr for Amount {
    type Err = EngineError;

    /// Parses a decimal string (`.` or `,` separator, at most 2 decimals,
    /// optional sign) into minor units.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {s:?}"));
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let rest = rest.replace(',', ".");
        let (major_str, minor_str) = match rest.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (rest.as_str(), ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if major_str.is_empty() || !all_digits(major_str) || !all_digits(minor_str) {
            return Err(invalid());
        }

        let major: i64 = major_str.parse().map_err(|_| overflow())?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid())? * 10,
            2 => minor_str.parse().map_err(|_| invalid())?,
            _ => return Err(EngineError::InvalidAmount("too many decimals".to_string())),
        };

        let total = major
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;

        Ok(Amount(if negative { -total } else { total }))
    }
}
