//! Cooperative tick clock and repeating-task driver.
//!
//! Models the host primitive "run a callback every N ticks, returning a
//! cancellable handle". The host advances the timer from its main loop; due
//! tasks run inline on the tick they come due, so a task never overlaps
//! itself and never runs off the host thread.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fixed tick type (one scheduling quantum, e.g. 20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    /// First tick in any timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// What a repeating task asks the timer to do after one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    /// Keep firing on the current period.
    Continue,
    /// Re-arm with a new period, counted from the current tick.
    Reschedule(u64),
    /// Cancel; the task will not run again.
    Cancel,
}

type TaskFn = Box<dyn FnMut(Tick) -> TaskControl>;

struct TaskSlot {
    period: u64,
    next_due: u64,
    cancelled: Rc<Cell<bool>>,
    run: TaskFn,
}

/// Cancellable handle for a scheduled repeating task.
#[derive(Clone)]
pub struct TaskHandle {
    cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
    /// Cancel the task. Idempotent; repeated calls are no-ops.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    /// Whether the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Single-threaded repeating-task timer driven by the host loop.
///
/// Periods are measured in ticks; a task scheduled with period N first runs
/// N ticks after registration, then every N ticks after each run.
pub struct TickTimer {
    now: Tick,
    tasks: Vec<TaskSlot>,
}

impl TickTimer {
    /// Create a timer at tick zero with no tasks.
    pub fn new() -> Self {
        Self {
            now: Tick::ZERO,
            tasks: Vec::new(),
        }
    }

    /// The current tick.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Number of live (not yet cancelled) tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Schedule `task` to run every `period` ticks (minimum 1).
    pub fn schedule_repeating(
        &mut self,
        period: u64,
        task: impl FnMut(Tick) -> TaskControl + 'static,
    ) -> TaskHandle {
        let period = period.max(1);
        let cancelled = Rc::new(Cell::new(false));
        self.tasks.push(TaskSlot {
            period,
            next_due: self.now.0 + period,
            cancelled: Rc::clone(&cancelled),
            run: Box::new(task),
        });
        debug!(period, "scheduled repeating task");
        TaskHandle { cancelled }
    }

    /// Advance one tick and run every task that comes due on it.
    pub fn tick(&mut self) {
        self.now = self.now.advance(1);
        let now = self.now;
        self.tasks.retain_mut(|slot| {
            if slot.cancelled.get() {
                return false;
            }
            if now.0 < slot.next_due {
                return true;
            }
            match (slot.run)(now) {
                TaskControl::Continue => {
                    slot.next_due = now.0 + slot.period;
                    true
                }
                TaskControl::Reschedule(period) => {
                    let period = period.max(1);
                    slot.period = period;
                    slot.next_due = now.0 + period;
                    true
                }
                TaskControl::Cancel => {
                    slot.cancelled.set(true);
                    false
                }
            }
        });
    }

    /// Advance `delta` ticks, running due tasks on each.
    pub fn advance(&mut self, delta: u64) {
        for _ in 0..delta {
            self.tick();
        }
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_task(counter: &Rc<Cell<u32>>) -> impl FnMut(Tick) -> TaskControl + 'static {
        let counter = Rc::clone(counter);
        move |_| {
            counter.set(counter.get() + 1);
            TaskControl::Continue
        }
    }

    #[test]
    fn task_first_runs_a_full_period_after_registration() {
        let mut timer = TickTimer::new();
        let runs = Rc::new(Cell::new(0));
        timer.schedule_repeating(3, counting_task(&runs));

        timer.advance(2);
        assert_eq!(runs.get(), 0);

        timer.tick();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn task_runs_once_per_period() {
        let mut timer = TickTimer::new();
        let runs = Rc::new(Cell::new(0));
        timer.schedule_repeating(3, counting_task(&runs));

        timer.advance(9);
        assert_eq!(runs.get(), 3);

        // A partial period does not produce an extra run.
        timer.advance(2);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn cancel_stops_future_runs_and_is_idempotent() {
        let mut timer = TickTimer::new();
        let runs = Rc::new(Cell::new(0));
        let handle = timer.schedule_repeating(2, counting_task(&runs));

        timer.advance(2);
        assert_eq!(runs.get(), 1);

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        timer.advance(10);
        assert_eq!(runs.get(), 1);
        assert_eq!(timer.task_count(), 0);
    }

    #[test]
    fn reschedule_changes_the_cadence() {
        let mut timer = TickTimer::new();
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        timer.schedule_repeating(2, move |_| {
            counter.set(counter.get() + 1);
            TaskControl::Reschedule(5)
        });

        // First run at tick 2, then every 5 ticks (7, 12).
        timer.advance(12);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn task_can_cancel_itself() {
        let mut timer = TickTimer::new();
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        timer.schedule_repeating(1, move |_| {
            counter.set(counter.get() + 1);
            TaskControl::Cancel
        });

        timer.advance(5);
        assert_eq!(runs.get(), 1);
        assert_eq!(timer.task_count(), 0);
    }

    #[test]
    fn zero_period_is_clamped_to_one() {
        let mut timer = TickTimer::new();
        let runs = Rc::new(Cell::new(0));
        timer.schedule_repeating(0, counting_task(&runs));

        timer.advance(3);
        assert_eq!(runs.get(), 3);
    }
}
