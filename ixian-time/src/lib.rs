// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Unsigned millisecond time used for timestamps and timeouts
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod error;
pub use error::TimeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use std::{
    convert::{TryFrom, TryInto},
    str::FromStr,
};

/// Time structure used everywhere.
/// milliseconds since 01/01/1970, or a duration in milliseconds.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct IxianTime(u64);

impl fmt::Display for IxianTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_millis())
    }
}

impl TryFrom<Duration> for IxianTime {
    type Error = TimeError;

    /// Conversion from `std::time::Duration`.
    /// ```
    /// # use std::time::Duration;
    /// # use ixian_time::*;
    /// # use std::convert::TryFrom;
    /// let duration: Duration = Duration::from_millis(42);
    /// let time : IxianTime = IxianTime::from_millis(42);
    /// assert_eq!(time, IxianTime::try_from(duration).unwrap());
    /// ```
    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Ok(IxianTime(
            value
                .as_millis()
                .try_into()
                .map_err(|_| TimeError::ConversionError)?,
        ))
    }
}

impl From<IxianTime> for Duration {
    fn from(value: IxianTime) -> Self {
        value.to_duration()
    }
}

impl FromStr for IxianTime {
    type Err = crate::TimeError;

    /// Conversion from `&str`, in milliseconds.
    ///
    /// ```
    /// # use ixian_time::*;
    /// # use std::str::FromStr;
    /// assert_eq!(IxianTime::from_millis(42), IxianTime::from_str("42").unwrap());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(IxianTime(
            u64::from_str(s).map_err(|_| Self::Err::ConversionError)?,
        ))
    }
}

impl IxianTime {
    /// Conversion from `u64`, representing milliseconds.
    pub const fn from_millis(value: u64) -> Self {
        IxianTime(value)
    }

    /// Conversion from whole seconds.
    /// ```
    /// # use ixian_time::*;
    /// assert_eq!(IxianTime::from_secs(10), IxianTime::from_millis(10_000));
    /// ```
    pub const fn from_secs(value: u64) -> Self {
        IxianTime(value.saturating_mul(1000))
    }

    /// Gets current UNIX timestamp (resolution: milliseconds).
    ///
    /// ```
    /// # use std::time::{Duration, SystemTime, UNIX_EPOCH};
    /// # use ixian_time::*;
    /// # use std::convert::TryFrom;
    /// # use std::cmp::max;
    /// let now_duration : Duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    /// let now_ixian_time : IxianTime = IxianTime::now().unwrap();
    /// let converted : IxianTime = IxianTime::try_from(now_duration).unwrap();
    /// assert!(max(now_ixian_time.saturating_sub(converted), converted.saturating_sub(now_ixian_time)) < IxianTime::from_millis(100))
    /// ```
    pub fn now() -> Result<Self, TimeError> {
        let now: u64 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeError::TimeOverflowError)?
            .as_millis()
            .try_into()
            .map_err(|_| TimeError::TimeOverflowError)?;
        Ok(IxianTime(now))
    }

    /// Conversion to `std::time::Duration`.
    pub fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Conversion to `u64`, representing milliseconds.
    pub const fn to_millis(&self) -> u64 {
        self.0
    }

    /// Estimates the `Instant` matching this timestamp, used for deadline waits.
    pub fn estimate_instant(self) -> Result<Instant, TimeError> {
        let (cur_timestamp, cur_instant) = (IxianTime::now()?, Instant::now());
        if self >= cur_timestamp {
            cur_instant.checked_add(self.saturating_sub(cur_timestamp).to_duration())
        } else {
            cur_instant.checked_sub(cur_timestamp.saturating_sub(self).to_duration())
        }
        .ok_or(TimeError::TimeOverflowError)
    }

    /// ```
    /// # use ixian_time::*;
    /// let time_1 : IxianTime = IxianTime::from_millis(42);
    /// let time_2 : IxianTime = IxianTime::from_millis(7);
    /// assert_eq!(time_1.saturating_sub(time_2), IxianTime::from_millis(35));
    /// assert_eq!(time_2.saturating_sub(time_1), IxianTime::from_millis(0));
    /// ```
    #[must_use]
    pub fn saturating_sub(self, t: IxianTime) -> Self {
        IxianTime(self.0.saturating_sub(t.0))
    }

    /// ```
    /// # use ixian_time::*;
    /// let time_1 : IxianTime = IxianTime::from_millis(42);
    /// let time_2 : IxianTime = IxianTime::from_millis(7);
    /// assert_eq!(time_1.saturating_add(time_2), IxianTime::from_millis(49));
    /// ```
    #[must_use]
    pub fn saturating_add(self, t: IxianTime) -> Self {
        IxianTime(self.0.saturating_add(t.0))
    }

    /// ```
    /// # use ixian_time::*;
    /// let time_1 : IxianTime = IxianTime::from_millis(42);
    /// let time_2 : IxianTime = IxianTime::from_millis(7);
    /// assert!(time_2.checked_sub(time_1).is_err());
    /// ```
    pub fn checked_sub(self, t: IxianTime) -> Result<Self, TimeError> {
        self.0
            .checked_sub(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("subtraction error".to_string()))
            .map(IxianTime)
    }

    /// Time elapsed between `earlier` and `self`, zero if `earlier` is in the future.
    #[must_use]
    pub fn elapsed_since(self, earlier: IxianTime) -> IxianTime {
        self.saturating_sub(earlier)
    }
}
