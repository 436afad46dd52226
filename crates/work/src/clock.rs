//! Source of "today" for proximity rules and due dates.

use sitegate_core::Date;

/// Supplies the current calendar day.
pub trait Clock: Send + Sync {
    /// Today's date.
    fn today(&self) -> Date;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        chrono::Local::now().date_naive()
    }
}

/// A clock stuck on one day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}
