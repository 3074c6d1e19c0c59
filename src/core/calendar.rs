//! Calendar for day-granularity simulation time
//!
//! One tick = one day. Years are fixed at 365 days (no leap years);
//! the seasonal logic only needs day-in-year boundaries.

use serde::{Deserialize, Serialize};

/// Days per simulated year
pub const DAYS_PER_YEAR: u32 = 365;

/// Day-in-year of 1 March (0-based, non-leap)
pub const MARCH_1: u32 = 59;
/// Day-in-year of 1 June
pub const JUNE_1: u32 = 151;
/// Day-in-year of 1 September
pub const SEPTEMBER_1: u32 = 243;

/// Cumulative day-in-year at the start of each month (non-leap)
const MONTH_STARTS: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Calendar tracks simulation time with day granularity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimCalendar {
    day: u64,
}

impl SimCalendar {
    /// Start at an absolute day offset (day-in-year of day 0 = offset % 365)
    pub fn new(start_day: u64) -> Self {
        Self { day: start_day }
    }

    pub fn advance(&mut self) {
        self.day += 1;
    }

    pub fn current_day(&self) -> u64 {
        self.day
    }

    pub fn day_in_year(&self) -> u32 {
        (self.day % DAYS_PER_YEAR as u64) as u32
    }

    pub fn year(&self) -> u32 {
        (self.day / DAYS_PER_YEAR as u64) as u32
    }

    /// Month index 0-11 for the current day
    pub fn month(&self) -> usize {
        let diy = self.day_in_year();
        MONTH_STARTS
            .iter()
            .rposition(|&start| diy >= start)
            .unwrap_or(0)
    }
}

impl Default for SimCalendar {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_advances() {
        let mut cal = SimCalendar::new(0);
        assert_eq!(cal.current_day(), 0);
        cal.advance();
        assert_eq!(cal.current_day(), 1);
    }

    #[test]
    fn test_year_rollover() {
        let mut cal = SimCalendar::new(364);
        assert_eq!(cal.year(), 0);
        assert_eq!(cal.day_in_year(), 364);
        cal.advance();
        assert_eq!(cal.year(), 1);
        assert_eq!(cal.day_in_year(), 0);
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(SimCalendar::new(0).month(), 0);
        assert_eq!(SimCalendar::new(30).month(), 0);
        assert_eq!(SimCalendar::new(31).month(), 1);
        assert_eq!(SimCalendar::new(MARCH_1 as u64).month(), 2);
        assert_eq!(SimCalendar::new(JUNE_1 as u64).month(), 5);
        assert_eq!(SimCalendar::new(SEPTEMBER_1 as u64).month(), 8);
        assert_eq!(SimCalendar::new(364).month(), 11);
    }
}
