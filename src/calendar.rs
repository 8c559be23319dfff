use std::collections::BTreeSet;

use crate::error::ConfigurationError;

/// Days in the planning cycle (Monday..Sunday).
pub const HORIZON: usize = 7;

pub const DAY_NAMES: [&str; HORIZON] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Tuesday and Friday.
pub const DEFAULT_NO_ORDER_DAYS: [usize; 2] = [1, 4];

/// Thursday.
pub const DEFAULT_DISCOUNT_DAY: usize = 3;

pub fn day_name(day: usize) -> &'static str {
    DAY_NAMES.get(day).copied().unwrap_or("?")
}

pub fn check_day(day: usize) -> Result<usize, ConfigurationError> {
    if day < HORIZON {
        Ok(day)
    } else {
        Err(ConfigurationError::DayOutOfRange(day))
    }
}

/// Which days of the week accept purchase orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderingCalendar {
    allowed: [bool; HORIZON],
}

impl Default for OrderingCalendar {
    fn default() -> Self {
        let mut allowed = [true; HORIZON];
        for day in DEFAULT_NO_ORDER_DAYS {
            allowed[day] = false;
        }
        Self { allowed }
    }
}

impl OrderingCalendar {
    /// Calendar accepting orders exactly on `days`. Replaces the default no-order days entirely.
    pub fn from_allowed_days(days: &BTreeSet<usize>) -> Result<Self, ConfigurationError> {
        if days.is_empty() {
            return Err(ConfigurationError::NoOrderingDays);
        }
        let mut allowed = [false; HORIZON];
        for &day in days {
            allowed[check_day(day)?] = true;
        }
        Ok(Self { allowed })
    }

    pub fn every_day() -> Self {
        Self {
            allowed: [true; HORIZON],
        }
    }

    pub fn is_allowed(&self, day: usize) -> bool {
        self.allowed.get(day).copied().unwrap_or(false)
    }

    pub fn allowed_days(&self) -> Vec<usize> {
        (0..HORIZON).filter(|&d| self.allowed[d]).collect()
    }

    pub fn no_order_days(&self) -> Vec<usize> {
        (0..HORIZON).filter(|&d| !self.allowed[d]).collect()
    }
}
