use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;
use tokio::sync::watch;
use tracing::{debug, info};

use super::history::Trigger;
use super::slot::{SlotSummary, TriggerSlot};
use super::ScheduleError;
use crate::clock::Clock;

/// Work the scheduler runs when a slot comes due.
#[async_trait::async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run_scheduled(&self, trigger: Trigger);
}

/// Snapshot of the scheduler's slots, published after every tick.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScheduleState {
    pub timezone: String,
    pub slots: Vec<SlotSummary>,
}

/// Read side of the scheduler state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    rx: watch::Receiver<ScheduleState>,
}

impl ScheduleHandle {
    pub fn schedule_state(&self) -> ScheduleState {
        self.rx.borrow().clone()
    }
}

/// Owns the trigger slots. The only writer of `last_fired_date`.
pub struct TriggerScheduler {
    slots: Vec<TriggerSlot>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    state_tx: watch::Sender<ScheduleState>,
}

impl TriggerScheduler {
    pub fn new(
        slots: Vec<TriggerSlot>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
    ) -> Result<(Self, ScheduleHandle), ScheduleError> {
        if slots.is_empty() {
            return Err(ScheduleError::NoSlots);
        }
        for (i, slot) in slots.iter().enumerate() {
            if slots[..i].iter().any(|s| s.hour() == slot.hour() && s.minute() == slot.minute()) {
                return Err(ScheduleError::DuplicateSlot(slot.label()));
            }
        }

        let now = clock.now();
        let (state_tx, rx) = watch::channel(snapshot(&slots, &now));
        let scheduler = Self {
            slots,
            clock,
            poll_interval,
            state_tx,
        };
        Ok((scheduler, ScheduleHandle { rx }))
    }

    pub fn slots(&self) -> &[TriggerSlot] {
        &self.slots
    }

    /// Check every slot once against the clock; run the job for each slot
    /// that is due, then mark it fired for today. Returns how many fired.
    pub async fn tick(&mut self, job: &dyn ScheduledJob) -> usize {
        let mut fired = 0;
        for i in 0..self.slots.len() {
            // Re-read per slot: an earlier slot's run may have taken a while.
            let now = self.clock.now();
            let local = now.naive_local();
            if !self.slots[i].is_due(&local) {
                continue;
            }

            let slot = self.slots[i].label();
            info!(%slot, %now, "trigger due, running pipeline");
            job.run_scheduled(Trigger::Scheduled { slot }).await;
            self.slots[i].mark_fired(local.date());
            fired += 1;
        }

        self.publish();
        fired
    }

    /// How long to sleep before the next tick: until the earliest upcoming
    /// slot, capped at the poll interval.
    pub fn next_wake(&self, now: &DateTime<Tz>) -> Duration {
        let next = self
            .slots
            .iter()
            .filter_map(|s| s.next_fire_after(now))
            .min();

        match next {
            Some(at) => (at - *now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.poll_interval),
            None => self.poll_interval,
        }
    }

    /// Poll forever. Runs are awaited inline, so a long run delays the next
    /// tick.
    pub async fn run(mut self, job: Arc<dyn ScheduledJob>) {
        info!(
            slots = ?self.slots.iter().map(TriggerSlot::label).collect::<Vec<_>>(),
            timezone = %self.clock.timezone(),
            "scheduler engine started"
        );

        loop {
            self.tick(job.as_ref()).await;
            let wait = self.next_wake(&self.clock.now());
            debug!(wait_secs = wait.as_secs_f64(), "scheduler sleeping");
            tokio::time::sleep(wait).await;
        }
    }

    fn publish(&self) {
        let now = self.clock.now();
        self.state_tx.send_replace(snapshot(&self.slots, &now));
    }
}

fn snapshot(slots: &[TriggerSlot], now: &DateTime<Tz>) -> ScheduleState {
    ScheduleState {
        timezone: now.timezone().name().to_string(),
        slots: slots.iter().map(|s| s.summary(now)).collect(),
    }
}
