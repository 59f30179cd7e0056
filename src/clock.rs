use time::{Date, OffsetDateTime, UtcOffset};

/// Source of the calendar day progress is counted against.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

/// Wall clock shifted to one fixed offset, so every user gets the same day boundary.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn with_offset_minutes(minutes: i32) -> anyhow::Result<Self> {
        let offset = UtcOffset::from_whole_seconds(minutes * 60)?;
        Ok(Self { offset })
    }
}

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.offset).date()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
