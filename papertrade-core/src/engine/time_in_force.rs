//! Expiration policy: Day vs Good-Till-Canceled.
//!
//! Day orders expire at the first market close strictly after submission.
//! The close is a wall-clock hour in the market's time zone, so it follows
//! daylight saving changes. Expiry is evaluated lazily: only when a tick for
//! the order's symbol arrives, and always before the order's trigger
//! condition.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::SimulatorConfig;
use crate::domain::{Order, TimeInForce};

/// Market-close calendar derived from configuration.
#[derive(Debug, Clone, Copy)]
pub struct MarketHours {
    close: NaiveTime,
    timezone: Tz,
}

impl MarketHours {
    /// `None` when the hour is out of range.
    pub fn new(close_hour: u32, timezone: Tz) -> Option<Self> {
        Some(Self {
            close: NaiveTime::from_hms_opt(close_hour, 0, 0)?,
            timezone,
        })
    }

    /// Falls back to a 16:00 close if the config was never validated.
    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self::new(config.market_close_hour, config.market_timezone).unwrap_or_else(|| Self {
            close: NaiveTime::MIN + Duration::hours(16),
            timezone: config.market_timezone,
        })
    }

    /// The first close instant strictly after `submitted_at`.
    pub fn next_close_after(&self, submitted_at: DateTime<Utc>) -> DateTime<Utc> {
        let local = submitted_at.with_timezone(&self.timezone);
        let mut date = local.date_naive();
        loop {
            // A close inside a spring-forward gap has no instant; that day is
            // skipped. In a fold the first occurrence wins.
            let close = self
                .timezone
                .from_local_datetime(&date.and_time(self.close))
                .earliest();
            if let Some(close) = close {
                let close = close.with_timezone(&Utc);
                if close > submitted_at {
                    return close;
                }
            }
            date += Duration::days(1);
        }
    }

    /// `expires_at` for a new order with the given time-in-force.
    pub fn expiry_for(
        &self,
        time_in_force: TimeInForce,
        submitted_at: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match time_in_force {
            TimeInForce::Day => Some(self.next_close_after(submitted_at)),
            TimeInForce::Gtc => None,
        }
    }
}

/// True when a Day order's expiry lies strictly before `now`.
pub fn is_expired(order: &Order, now: DateTime<Utc>) -> bool {
    match (order.time_in_force, order.expires_at) {
        (TimeInForce::Day, Some(expires_at)) => now > expires_at,
        _ => false,
    }
}
