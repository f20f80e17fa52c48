//! Wake times for the refresh loops.

use std::time::Duration;

use time::Time;

use crate::{UtcDateTime, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Once a day at a UTC wall-clock time.
    DailyAt { hour: u8, minute: u8 },
    /// Fixed interval from the previous wake.
    Every(Duration),
}

impl Schedule {
    pub fn daily_at(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        Time::from_hms(hour, minute, 0)
            .map(|_| Self::DailyAt { hour, minute })
            .map_err(|_| ValidationError::InvalidWallClock { hour, minute })
    }

    pub fn every(interval: Duration) -> Result<Self, ValidationError> {
        if interval.is_zero() {
            return Err(ValidationError::ZeroInterval);
        }
        Ok(Self::Every(interval))
    }

    /// First wake strictly after `now`.
    pub fn next_after(&self, now: UtcDateTime) -> UtcDateTime {
        match *self {
            Self::DailyAt { hour, minute } => {
                let wall = Time::from_hms(hour, minute, 0).unwrap_or(Time::MIDNIGHT);
                let today = UtcDateTime::start_of_day(now.date()).saturating_add(
                    wall - Time::MIDNIGHT,
                );
                if today > now {
                    today
                } else {
                    today.saturating_add(time::Duration::DAY)
                }
            }
            Self::Every(interval) => now.saturating_add(
                time::Duration::try_from(interval).unwrap_or(time::Duration::MAX),
            ),
        }
    }

    /// How long to sleep from `now` until the next wake.
    pub fn wait_from(&self, now: UtcDateTime) -> Duration {
        let gap = self.next_after(now).into_inner() - now.into_inner();
        Duration::try_from(gap).unwrap_or(Duration::ZERO)
    }
}
