use chrono::{Local, NaiveDateTime};

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync + 'static {
    /// Current wall-clock time in the local timezone, without the offset.
    fn time(&self) -> NaiveDateTime;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
