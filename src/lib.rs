#![warn(missing_docs)]
//! Budget-capped cooperative sweep scheduling for tick-driven hosts.
//!
//! `ticksweep` periodically visits a dynamic, host-owned collection of live
//! objects (game entities, connections, cache entries) at a bounded rate per
//! tick, without stalling the host's main loop. Each firing re-reads the
//! object set, filters it through a per-category [`VisitorPolicy`], and
//! stops as soon as the per-firing budget is spent. Configuration is an
//! immutable snapshot that can be swapped between firings, including from a
//! TOML profile via the operator [`commands`] surface.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use ticksweep::{Categorized, ObjectSource, Sweep, SweepConfig, TickTimer, VisitorPolicy};
//!
//! struct Mob {
//!     kind: &'static str,
//! }
//!
//! impl Categorized for Mob {
//!     fn category(&self) -> &str {
//!         self.kind
//!     }
//! }
//!
//! struct World {
//!     mobs: Vec<&'static str>,
//! }
//!
//! impl ObjectSource for World {
//!     type Object = Mob;
//!
//!     fn list(&self) -> Box<dyn Iterator<Item = Mob> + '_> {
//!         Box::new(self.mobs.iter().copied().map(|kind| Mob { kind }))
//!     }
//! }
//!
//! let mut timer = TickTimer::new();
//! let visited = Rc::new(Cell::new(0u32));
//! let seen = Rc::clone(&visited);
//! let sweep = Sweep::new(
//!     SweepConfig {
//!         period_ticks: 2,
//!         max_visits_per_firing: 10,
//!         enabled: true,
//!     },
//!     VisitorPolicy::allow_all(),
//!     World {
//!         mobs: vec!["zombie", "piglin"],
//!     },
//!     move |_mob: &Mob| {
//!         seen.set(seen.get() + 1);
//!         Ok(())
//!     },
//! )
//! .unwrap();
//! let handle = sweep.spawn(&mut timer);
//!
//! timer.advance(4); // two firings
//! assert_eq!(visited.get(), 4);
//! handle.stop();
//! ```

pub mod commands;
pub mod config;
pub mod policy;
pub mod sweep;
pub mod timer;

pub use commands::{
    execute_command, parse_command, CommandContext, CommandError, CommandOutput, SweepCommand,
};
pub use config::{ConfigError, DebugOptions, ReloadError, SweepConfig, SweepProfile};
pub use policy::{CategoryRule, VisitorPolicy};
pub use sweep::{
    Categorized, FiringOutcome, ObjectSource, Sweep, SweepHandle, SweepStats, Visitor,
};
pub use timer::{TaskControl, TaskHandle, Tick, TickTimer};
