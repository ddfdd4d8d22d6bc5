//! Fixed-interval server loop.
//!
//! [`ServerTick`] owns the authoritative [`World`] and the
//! [`LifecycleScheduler`]. Each tick:
//!
//! 1. The scheduler advances by `fixed_dt`: due breaks and regenerations
//!    fire, kinematic and chase entities move.
//! 2. Movement updates are coalesced per entity and released through the
//!    broadcast rate limiter; discrete events pass straight through.
//! 3. The tick counter advances.
//!
//! # Example
//!
//! ```
//! use hopper_sim::prelude::*;
//!
//! let mut server = ServerTick::new(World::new(), TickConfig::default()).unwrap();
//! let platform = server
//!     .spawn(
//!         EntitySpec::new(EntityKind::Platform, Vec3::ZERO, Vec3::new(4.0, 1.0, 4.0))
//!             .with_properties(Properties { breakable: true, ..Default::default() }),
//!     )
//!     .unwrap();
//!
//! server.trigger_break(&platform.id);
//! server.run_ticks(10, &[]);
//! assert!(!server.world().contains(&platform.id));
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use hopper_world::entity::{Entity, EntityId, EntityPatch, EntitySpec};
use hopper_world::math::Vec3;
use hopper_world::snapshot::WorldSnapshot;
use hopper_world::store::World;

use crate::config::TickConfig;
use crate::events::SimEvent;
use crate::lifecycle::{BreakOutcome, LifecycleScheduler};
use crate::throttle::RateLimiter;
use crate::{ConfigError, SimError};

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing and volume for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Wall-clock time spent in the lifecycle scheduler.
    pub lifecycle_time: Duration,
    /// Total wall-clock time for the tick.
    pub total_time: Duration,
    /// Events returned to the caller.
    pub events: usize,
    /// Movement updates held back by the broadcast limiter.
    pub pending_moves: usize,
}

// ---------------------------------------------------------------------------
// ServerTick
// ---------------------------------------------------------------------------

/// The server-authoritative simulation driver.
#[derive(Debug)]
pub struct ServerTick {
    world: World,
    scheduler: LifecycleScheduler,
    config: TickConfig,
    tick_counter: u64,
    broadcasts: RateLimiter,
    /// Latest unsent movement per entity, in first-moved order.
    pending_moves: Vec<(EntityId, Vec3, f64)>,
    last_diagnostics: TickDiagnostics,
}

impl ServerTick {
    /// Wrap `world` in a server loop.
    ///
    /// Fails if `fixed_dt` is not positive and finite.
    pub fn new(world: World, config: TickConfig) -> Result<Self, SimError> {
        if !(config.fixed_dt.is_finite() && config.fixed_dt > 0.0) {
            return Err(ConfigError::Invalid {
                field: "fixed_dt",
                details: format!("must be positive and finite, got {}", config.fixed_dt),
            }
            .into());
        }
        Ok(Self {
            world,
            scheduler: LifecycleScheduler::new(config.chase_snap_distance),
            broadcasts: RateLimiter::new(config.broadcast_interval_ms),
            config,
            tick_counter: 0,
            pending_moves: Vec::new(),
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    /// Execute one tick. `players` are the positions of living players.
    pub fn tick(&mut self, players: &[Vec3]) -> Vec<SimEvent> {
        let tick_start = Instant::now();

        let lifecycle_start = Instant::now();
        let raw = self
            .scheduler
            .tick(&mut self.world, players, self.config.fixed_dt);
        let lifecycle_time = lifecycle_start.elapsed();

        let mut out = Vec::with_capacity(raw.len());
        for event in raw {
            match event {
                SimEvent::EntityMoved {
                    id,
                    position,
                    rotation,
                } => self.queue_move(id, position, rotation),
                SimEvent::EntityDestroyed { ref id } => {
                    self.pending_moves.retain(|(pending, _, _)| pending != id);
                    out.push(event);
                }
                other => out.push(other),
            }
        }

        if !self.pending_moves.is_empty() && self.broadcasts.ready(self.scheduler.now_ms()) {
            out.extend(
                self.pending_moves
                    .drain(..)
                    .map(|(id, position, rotation)| SimEvent::EntityMoved {
                        id,
                        position,
                        rotation,
                    }),
            );
        }

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            lifecycle_time,
            total_time: tick_start.elapsed(),
            events: out.len(),
            pending_moves: self.pending_moves.len(),
        };
        trace!(
            tick = self.tick_counter,
            events = out.len(),
            pending_moves = self.pending_moves.len(),
            "server tick"
        );
        out
    }

    fn queue_move(&mut self, id: EntityId, position: Vec3, rotation: f64) {
        match self.pending_moves.iter_mut().find(|(p, _, _)| *p == id) {
            Some(slot) => {
                slot.1 = position;
                slot.2 = rotation;
            }
            None => self.pending_moves.push((id, position, rotation)),
        }
    }

    /// Run `count` ticks with a fixed player set. Returns the number of
    /// events produced.
    pub fn run_ticks(&mut self, count: u64, players: &[Vec3]) -> u64 {
        let mut total = 0u64;
        for _ in 0..count {
            total += self.tick(players).len() as u64;
        }
        total
    }

    // -- world mutation ------------------------------------------------------

    /// Spawn an entity on behalf of a client request.
    pub fn spawn(&mut self, spec: EntitySpec) -> Result<Entity, SimError> {
        let entity = self.world.spawn(spec)?;
        debug!(entity = %entity.id, kind = %entity.kind, "spawned by request");
        Ok(entity)
    }

    pub fn modify(&mut self, id: &EntityId, patch: EntityPatch) -> Result<Entity, SimError> {
        Ok(self.world.modify(id, patch)?)
    }

    pub fn destroy(&mut self, id: &EntityId) -> Result<Entity, SimError> {
        let entity = self.world.destroy(id)?;
        self.pending_moves.retain(|(pending, _, _)| pending != id);
        Ok(entity)
    }

    /// Remove every entity. Pending breaks and regenerations are abandoned
    /// when they come due.
    pub fn clear_world(&mut self) {
        self.world.clear();
        self.pending_moves.clear();
        debug!(epoch = self.world.epoch(), "world cleared");
    }

    /// Forward a platform-step notification to the scheduler.
    pub fn trigger_break(&mut self, id: &EntityId) -> BreakOutcome {
        self.scheduler.trigger_break(&self.world, id)
    }

    /// Hashed copy of the world for late joiners.
    pub fn snapshot(&self) -> WorldSnapshot {
        self.world.capture_snapshot()
    }

    // -- accessors ----------------------------------------------------------

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulation time in seconds, computed as `tick_count * fixed_dt`.
    pub fn sim_time(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the world, for setup and tests.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scheduler(&self) -> &LifecycleScheduler {
        &self.scheduler
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
