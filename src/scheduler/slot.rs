//! Daily time-of-day trigger slots.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::Serialize;

use super::ScheduleError;

/// How far ahead to look for a slot's next local occurrence. Covers DST
/// gaps that swallow the slot's local time for a day.
const LOOKAHEAD_DAYS: u64 = 7;

/// One daily trigger at `hour:minute` local time. Fires at most once per
/// calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSlot {
    hour: u32,
    minute: u32,
    last_fired_date: Option<NaiveDate>,
}

/// Read-only view of a slot for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSummary {
    pub hour: u32,
    pub minute: u32,
    pub label: String,
    pub last_fired_date: Option<NaiveDate>,
    pub next_fire_at: Option<String>,
}

impl TriggerSlot {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidSlot { hour, minute });
        }
        Ok(Self {
            hour,
            minute,
            last_fired_date: None,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn last_fired_date(&self) -> Option<NaiveDate> {
        self.last_fired_date
    }

    /// `HH:MM`
    pub fn label(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// True when `now` (local wall-clock) is inside this slot's minute and
    /// the slot has not fired on `now`'s date.
    pub fn is_due(&self, now: &NaiveDateTime) -> bool {
        now.hour() == self.hour
            && now.minute() == self.minute
            && self.last_fired_date != Some(now.date())
    }

    pub(crate) fn mark_fired(&mut self, date: NaiveDate) {
        self.last_fired_date = Some(date);
    }

    /// Next instant at which this slot will be due, at or after the start of
    /// the current minute. Local times skipped by a DST change roll over to
    /// the following day.
    pub fn next_fire_after(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = now.timezone();
        let today = now.date_naive();
        let at = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;

        for offset in 0..=LOOKAHEAD_DAYS {
            let date = today.checked_add_days(Days::new(offset))?;
            if offset == 0 {
                let passed = (self.hour, self.minute) < (now.hour(), now.minute());
                if passed || self.last_fired_date == Some(today) {
                    continue;
                }
            }
            if let Some(instant) = tz.from_local_datetime(&date.and_time(at)).earliest() {
                return Some(instant);
            }
        }
        None
    }

    pub fn summary(&self, now: &DateTime<Tz>) -> SlotSummary {
        SlotSummary {
            hour: self.hour,
            minute: self.minute,
            label: self.label(),
            last_fired_date: self.last_fired_date,
            next_fire_at: self.next_fire_after(now).map(|t| t.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::{Merida, New_York};

    fn merida(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Tz> {
        Merida.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(TriggerSlot::new(24, 0).is_err());
        assert!(TriggerSlot::new(0, 60).is_err());
        assert!(TriggerSlot::new(23, 59).is_ok());
    }

    #[test]
    fn test_label() {
        assert_eq!(TriggerSlot::new(7, 5).unwrap().label(), "07:05");
    }

    #[test]
    fn test_due_only_inside_its_minute() {
        let slot = TriggerSlot::new(7, 30).unwrap();
        assert!(!slot.is_due(&merida(2026, 10, 19, 7, 29, 59).naive_local()));
        assert!(slot.is_due(&merida(2026, 10, 19, 7, 30, 0).naive_local()));
        assert!(slot.is_due(&merida(2026, 10, 19, 7, 30, 59).naive_local()));
        assert!(!slot.is_due(&merida(2026, 10, 19, 7, 31, 0).naive_local()));
    }

    #[test]
    fn test_not_due_again_same_day() {
        let mut slot = TriggerSlot::new(7, 30).unwrap();
        let now = merida(2026, 10, 19, 7, 30, 0).naive_local();
        slot.mark_fired(now.date());
        assert!(!slot.is_due(&merida(2026, 10, 19, 7, 30, 40).naive_local()));
        assert!(slot.is_due(&merida(2026, 10, 20, 7, 30, 0).naive_local()));
    }

    #[test]
    fn test_next_fire_later_today() {
        let slot = TriggerSlot::new(12, 0).unwrap();
        let next = slot.next_fire_after(&merida(2026, 10, 19, 7, 45, 12)).unwrap();
        assert_eq!(next, merida(2026, 10, 19, 12, 0, 0));
    }

    #[test]
    fn test_next_fire_tomorrow_when_passed_or_fired() {
        let mut slot = TriggerSlot::new(7, 30).unwrap();
        let next = slot.next_fire_after(&merida(2026, 10, 19, 8, 0, 0)).unwrap();
        assert_eq!(next, merida(2026, 10, 20, 7, 30, 0));

        let now = merida(2026, 10, 19, 7, 30, 10);
        assert_eq!(slot.next_fire_after(&now).unwrap(), merida(2026, 10, 19, 7, 30, 0));
        slot.mark_fired(now.date_naive());
        assert_eq!(slot.next_fire_after(&now).unwrap(), merida(2026, 10, 20, 7, 30, 0));
    }

    #[test]
    fn test_next_fire_skips_dst_gap() {
        // 2026-03-08 02:30 does not exist in New York.
        let slot = TriggerSlot::new(2, 30).unwrap();
        let now = New_York.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let next = slot.next_fire_after(&now).unwrap();
        assert_eq!(next, New_York.with_ymd_and_hms(2026, 3, 9, 2, 30, 0).unwrap());
    }

    #[test]
    fn test_summary() {
        let slot = TriggerSlot::new(12, 0).unwrap();
        let summary = slot.summary(&merida(2026, 10, 19, 7, 0, 0));
        assert_eq!(summary.label, "12:00");
        assert_eq!(summary.last_fired_date, None);
        assert_eq!(summary.next_fire_at.as_deref(), Some("2026-10-19T12:00:00-06:00"));
    }
}
