//! The sweep scheduler: periodic, budget-bounded traversal of a live object
//! set.
//!
//! A [`Sweep`] walks whatever its [`ObjectSource`] lists at the moment of
//! each firing, applies the [`VisitorPolicy`](crate::policy::VisitorPolicy)
//! per object, and stops early once the per-firing budget is spent. The walk
//! restarts from the front of the (possibly reordered) set on every firing;
//! no rotation or cumulative-coverage guarantee is made across firings.
//!
//! Firings run inline on the host tick that drives them, so a firing can
//! never overlap another and reconfiguration between firings is a plain
//! snapshot handoff with no locking.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::{ConfigError, DebugOptions, SweepConfig};
use crate::policy::VisitorPolicy;
use crate::timer::{TaskControl, TaskHandle, Tick, TickTimer};

/// Objects the sweep can visit report a canonical category key.
pub trait Categorized {
    /// Canonical lowercase key used for policy lookup and logging.
    fn category(&self) -> &str;
}

/// Live view over the host's tracked objects.
///
/// `list` is called once per firing and the result is never cached, so the
/// host set may mutate freely between firings.
pub trait ObjectSource {
    /// Handle type yielded by the source.
    type Object: Categorized;

    /// Lazily enumerate the current object set.
    fn list(&self) -> Box<dyn Iterator<Item = Self::Object> + '_>;
}

/// Per-object action invoked for each eligible object.
///
/// Implemented for any `FnMut(&T) -> anyhow::Result<()>` closure. Errors are
/// logged with category context and isolated; they never abort the firing.
pub trait Visitor<T> {
    /// Visit one object.
    fn visit(&mut self, object: &T) -> anyhow::Result<()>;
}

impl<T, F> Visitor<T> for F
where
    F: FnMut(&T) -> anyhow::Result<()>,
{
    fn visit(&mut self, object: &T) -> anyhow::Result<()> {
        self(object)
    }
}

/// Counters for a running sweep. Created fresh on start, discarded on stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepStats {
    /// Completed firings. Gate-skipped attempts are not counted.
    pub firings: u64,
    /// Objects visited across all firings.
    pub visited_total: u64,
    /// Objects visited by the most recent firing.
    pub last_visited: usize,
    /// Tick of the most recent firing.
    pub last_firing_tick: Option<Tick>,
}

/// What one due tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringOutcome {
    /// A firing ran and visited this many objects.
    Fired {
        /// Objects visited, after policy filtering and budget capping.
        visited: usize,
    },
    /// The gate reported no consumers; nothing ran, counters unchanged.
    Skipped,
    /// The active config was disabled; the sweep cancelled itself.
    Disabled,
}

#[derive(Default)]
struct SweepShared {
    running: bool,
    pending_config: Option<SweepConfig>,
    pending_policy: Option<VisitorPolicy>,
    stats: SweepStats,
}

/// A configured sweep over `S`'s objects.
///
/// Hosts normally hand the sweep to a [`TickTimer`] via [`Sweep::spawn`] and
/// keep the returned [`SweepHandle`]; [`Sweep::fire`] is public for hosts
/// that drive firings from their own loop.
pub struct Sweep<S: ObjectSource, V: Visitor<S::Object>> {
    config: SweepConfig,
    policy: VisitorPolicy,
    source: S,
    visitor: V,
    gate: Option<Box<dyn Fn() -> bool>>,
    debug: DebugOptions,
    shared: Rc<RefCell<SweepShared>>,
}

impl<S: ObjectSource, V: Visitor<S::Object>> Sweep<S, V> {
    /// Build a sweep, validating the configuration and policy up front.
    pub fn new(
        config: SweepConfig,
        policy: VisitorPolicy,
        source: S,
        visitor: V,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        policy.validate()?;
        Ok(Self {
            config,
            policy,
            source,
            visitor,
            gate: None,
            debug: DebugOptions::default(),
            shared: Rc::new(RefCell::new(SweepShared::default())),
        })
    }

    /// Gate firings on a host condition (typically: only sweep while at
    /// least one observer is connected). A firing whose gate returns
    /// `false` is skipped with no side effects.
    pub fn with_gate(mut self, gate: impl Fn() -> bool + 'static) -> Self {
        self.gate = Some(Box::new(gate));
        self
    }

    /// Apply debug switches from a profile.
    pub fn with_debug(mut self, debug: DebugOptions) -> Self {
        self.debug = debug;
        self
    }

    /// The active configuration.
    pub fn config(&self) -> SweepConfig {
        self.config
    }

    /// Counters so far.
    pub fn stats(&self) -> SweepStats {
        self.shared.borrow().stats
    }

    /// Run one due tick by hand.
    ///
    /// Applies any pending reconfiguration, then runs the firing algorithm:
    /// disabled config cancels, a closed gate skips, otherwise the current
    /// object set is walked under the policy and budget.
    pub fn fire(&mut self, now: Tick) -> FiringOutcome {
        {
            let mut shared = self.shared.borrow_mut();
            if let Some(config) = shared.pending_config.take() {
                self.config = config;
            }
            if let Some(policy) = shared.pending_policy.take() {
                self.policy = policy;
            }
        }

        if !self.config.enabled {
            self.shared.borrow_mut().running = false;
            info!("sweep disabled by configuration; cancelling");
            return FiringOutcome::Disabled;
        }

        if let Some(gate) = &self.gate {
            if !gate() {
                return FiringOutcome::Skipped;
            }
        }

        let firing_index = self.shared.borrow().stats.firings;
        let budget = self.config.max_visits_per_firing;
        let mut visited = 0usize;
        for object in self.source.list() {
            if budget > 0 && visited >= budget {
                break;
            }
            let category = object.category();
            if !self.policy.eligible(category, firing_index) {
                continue;
            }
            if let Err(err) = self.visitor.visit(&object) {
                warn!(category, "visitor failed: {err:#}");
            }
            if self.debug.log_visits {
                debug!(category, "visited object");
            }
            visited += 1;
        }

        let mut shared = self.shared.borrow_mut();
        shared.stats.firings += 1;
        shared.stats.visited_total += visited as u64;
        shared.stats.last_visited = visited;
        shared.stats.last_firing_tick = Some(now);
        if self.debug.firing_stats {
            debug!(
                firing = shared.stats.firings,
                visited,
                tick = now.0,
                "firing complete"
            );
        }
        FiringOutcome::Fired { visited }
    }

    fn fire_control(&mut self, now: Tick) -> TaskControl {
        let period_before = self.config.period_ticks;
        match self.fire(now) {
            FiringOutcome::Disabled => TaskControl::Cancel,
            FiringOutcome::Fired { .. } | FiringOutcome::Skipped => {
                if self.config.period_ticks != period_before {
                    TaskControl::Reschedule(self.config.period_ticks)
                } else {
                    TaskControl::Continue
                }
            }
        }
    }
}

impl<S, V> Sweep<S, V>
where
    S: ObjectSource + 'static,
    V: Visitor<S::Object> + 'static,
{
    /// Register with the host timer and start firing every
    /// `config.period_ticks` ticks.
    pub fn spawn(mut self, timer: &mut TickTimer) -> SweepHandle {
        let shared = Rc::clone(&self.shared);
        shared.borrow_mut().running = true;
        let period = self.config.period_ticks;
        info!(period, "sweep started");
        let task = timer.schedule_repeating(period, move |now| self.fire_control(now));
        SweepHandle { task, shared }
    }
}

/// Control handle for a spawned sweep.
pub struct SweepHandle {
    task: TaskHandle,
    shared: Rc<RefCell<SweepShared>>,
}

impl SweepHandle {
    /// Cancel future firings. Idempotent; an in-flight firing always
    /// completes before the sweep is considered stopped.
    pub fn stop(&self) {
        if !self.task.is_cancelled() {
            info!("sweep stopped");
        }
        self.task.cancel();
        self.shared.borrow_mut().running = false;
    }

    /// Whether the sweep will still fire.
    pub fn is_running(&self) -> bool {
        self.shared.borrow().running && !self.task.is_cancelled()
    }

    /// Stage a new configuration snapshot; the next firing reads it.
    ///
    /// Validation happens here, synchronously. A rejected configuration
    /// never affects the running sweep.
    pub fn reconfigure(&self, config: SweepConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.shared.borrow_mut().pending_config = Some(config);
        Ok(())
    }

    /// Stage a new visitor policy; the next firing reads it.
    pub fn set_policy(&self, policy: VisitorPolicy) -> Result<(), ConfigError> {
        policy.validate()?;
        self.shared.borrow_mut().pending_policy = Some(policy);
        Ok(())
    }

    /// Counters for the running sweep.
    pub fn stats(&self) -> SweepStats {
        self.shared.borrow().stats
    }
}
