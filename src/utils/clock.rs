use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing dates across application. Lets tests control
/// what "now" means for cache freshness.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
