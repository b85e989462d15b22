// Copyright (c) 2022 MASSA LABS <info@massa.net>

use crate::config::AMOUNT_DECIMAL_FACTOR;
use crate::ModelsError;
use rust_decimal::prelude::*;
use serde::de::Unexpected;
use std::fmt;
use std::str::FromStr;

/// Number of decimals of an IXI amount
const AMOUNT_DECIMALS: u32 = 8;

/// IXI balance or transfer value, stored as a count of 10^-8 IXI units.
///
/// Arithmetic is checked: a result above `Amount::MAX` (184467440737.09551615 IXI)
/// or below zero is `None`, and callers reject the transaction or block carrying it.
/// Text and JSON forms are decimal strings such as `"10.5"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Ord, PartialOrd, Default, Hash)]
pub struct Amount(u64);

impl Amount {
    /// Largest representable amount
    pub const MAX: Amount = Amount(u64::MAX);

    /// 0 IXI
    pub const fn zero() -> Self {
        Amount(0)
    }

    /// Count of 10^-8 units, as written on the wire and in the wallet state checksum
    pub fn to_raw(&self) -> u64 {
        self.0
    }

    /// Amount of `raw` 10^-8 units
    pub const fn from_raw(raw: u64) -> Self {
        Amount(raw)
    }

    /// `units` whole IXI, `None` above `Amount::MAX`
    pub const fn from_units(units: u64) -> Option<Self> {
        match units.checked_mul(AMOUNT_DECIMAL_FACTOR) {
            Some(raw) => Some(Amount(raw)),
            None => None,
        }
    }

    /// true for 0 IXI
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `None` above `Amount::MAX`
    pub fn checked_add(self, other: Amount) -> Option<Self> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// `None` below zero
    pub fn checked_sub(self, other: Amount) -> Option<Self> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Used for totals that are only reported, never credited
    #[must_use]
    pub fn saturating_add(self, other: Amount) -> Self {
        Amount(self.0.saturating_add(other.0))
    }

    /// Price of `count` size units
    pub fn checked_mul_u64(self, count: u64) -> Option<Self> {
        self.0.checked_mul(count).map(Amount)
    }

    /// Even share among `parts` recipients, the remainder is dropped
    pub fn checked_div_u64(self, parts: u64) -> Option<Self> {
        self.0.checked_div(parts).map(Amount)
    }

    /// Total of `amounts`, `None` on overflow
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Amount::zero(), Amount::checked_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimal = Decimal::from_i128_with_scale(self.0 as i128, AMOUNT_DECIMALS);
        write!(f, "{}", decimal.normalize())
    }
}

impl FromStr for Amount {
    type Err = ModelsError;

    /// Parses a non-negative decimal with at most 8 decimals
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parse_error =
            |reason: &str| ModelsError::AmountParseError(format!("{}: {}", text, reason));
        let decimal = Decimal::from_str(text).map_err(|err| parse_error(&err.to_string()))?;
        if decimal.is_sign_negative() {
            return Err(parse_error("negative amount"));
        }
        let raw = decimal
            .checked_mul(Decimal::from(AMOUNT_DECIMAL_FACTOR))
            .ok_or_else(|| parse_error("above the maximum amount"))?;
        if !raw.fract().is_zero() {
            return Err(parse_error("more than 8 decimals"));
        }
        raw.to_u64()
            .map(Amount)
            .ok_or_else(|| parse_error("above the maximum amount"))
    }
}

impl serde::Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_str(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> serde::de::Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn visit_str<E>(self, value: &str) -> Result<Amount, E>
    where
        E: serde::de::Error,
    {
        Amount::from_str(value).map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a decimal IXI amount with at most 8 decimals")
    }
}
