//! Wall-clock access in the configured timezone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Source of the current time in a named timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;

    fn timezone(&self) -> Tz;
}

/// The real system clock, projected into `tz`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Short human label for a timezone: the last segment of its IANA name
/// (`America/Merida` -> `Merida`).
pub fn timezone_label(tz: Tz) -> &'static str {
    let name = tz.name();
    name.rsplit('/').next().unwrap_or(name)
}
