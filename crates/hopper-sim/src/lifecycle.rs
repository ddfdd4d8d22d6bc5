//! Server-side time-driven entity state.
//!
//! The [`LifecycleScheduler`] advances everything that changes without a
//! player touching it: breakable platforms counting down to destruction and
//! regeneration, kinematic platforms ping-ponging along their path, and chase
//! groups pursuing the nearest player.
//!
//! Break and regeneration are entries in a min-heap keyed by fire time,
//! drained at the start of every tick. Each entry records the world epoch it
//! was scheduled in and is dropped if the world has been cleared since.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::{debug, trace};

use hopper_world::entity::{EntityId, EntitySpec};
use hopper_world::math::{yaw_towards, Vec3};
use hopper_world::store::World;

use crate::events::SimEvent;

/// Distance at which a chaser stops advancing.
pub const DEFAULT_SNAP_DISTANCE: f64 = 0.5;

/// Result of asking a platform to start breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOutcome {
    /// A break was scheduled for `break_at` (scheduler ms).
    Scheduled { break_at: u64 },
    /// The platform is already counting down; nothing changed.
    AlreadyBreaking,
    /// The entity exists but is not breakable.
    NotBreakable,
    /// No such entity.
    Missing,
}

/// A pending break.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakingRecord {
    pub entity_id: EntityId,
    pub break_at: u64,
    pub regen_delay: u64,
    /// What to respawn if regeneration is enabled.
    pub original: EntitySpec,
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Action {
    Break { id: EntityId },
    Regen { spec: EntitySpec },
}

#[derive(Debug, Clone)]
struct Scheduled {
    fire_at: u64,
    seq: u64,
    epoch: u64,
    action: Action,
}

// Reversed so the max-heap pops the earliest entry; `seq` keeps ties in
// insertion order.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

/// Ping-pong progress along a path's endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathState {
    /// In `[0, 1]`.
    pub progress: f64,
    /// `1.0` toward the last waypoint, `-1.0` back toward the first.
    pub direction: f64,
}

impl Default for PathState {
    fn default() -> Self {
        Self {
            progress: 0.0,
            direction: 1.0,
        }
    }
}

impl PathState {
    /// Advance by `step`, clamping and reversing at either end.
    pub fn advance(&mut self, step: f64) {
        self.progress += step * self.direction;
        if self.progress >= 1.0 {
            self.progress = 1.0;
            self.direction = -1.0;
        } else if self.progress <= 0.0 {
            self.progress = 0.0;
            self.direction = 1.0;
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleScheduler
// ---------------------------------------------------------------------------

/// Drives breakables, kinematic paths, and chase groups.
#[derive(Debug, Clone)]
pub struct LifecycleScheduler {
    now_ms: u64,
    sim_time: f64,
    seq: u64,
    schedule: BinaryHeap<Scheduled>,
    breaking: HashMap<EntityId, BreakingRecord>,
    paths: HashMap<EntityId, PathState>,
    facing: HashMap<EntityId, f64>,
    snap_distance: f64,
}

impl Default for LifecycleScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_SNAP_DISTANCE)
    }
}

impl LifecycleScheduler {
    pub fn new(snap_distance: f64) -> Self {
        Self {
            now_ms: 0,
            sim_time: 0.0,
            seq: 0,
            schedule: BinaryHeap::new(),
            breaking: HashMap::new(),
            paths: HashMap::new(),
            facing: HashMap::new(),
            snap_distance: snap_distance.max(0.0),
        }
    }

    /// Scheduler clock in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of pending break/regen entries.
    pub fn pending(&self) -> usize {
        self.schedule.len()
    }

    pub fn breaking(&self, id: &EntityId) -> Option<&BreakingRecord> {
        self.breaking.get(id)
    }

    pub fn path_state(&self, id: &EntityId) -> Option<&PathState> {
        self.paths.get(id)
    }

    /// Last facing angle recorded for a moving entity (group leader for
    /// chasers).
    pub fn facing(&self, id: &EntityId) -> Option<f64> {
        self.facing.get(id).copied()
    }

    // -- breakables ----------------------------------------------------------

    /// Start the break countdown for `id` at the current scheduler time.
    ///
    /// Repeated triggers while the countdown runs are ignored.
    pub fn trigger_break(&mut self, world: &World, id: &EntityId) -> BreakOutcome {
        let Some(entity) = world.get(id) else {
            return BreakOutcome::Missing;
        };
        if !entity.properties.breakable {
            return BreakOutcome::NotBreakable;
        }
        if self.breaking.contains_key(id) {
            return BreakOutcome::AlreadyBreaking;
        }

        let break_at = self
            .now_ms
            .saturating_add(entity.properties.break_delay_or_default());
        let record = BreakingRecord {
            entity_id: id.clone(),
            break_at,
            regen_delay: entity.properties.regen_delay_or_default(),
            original: EntitySpec::from(entity),
        };
        self.breaking.insert(id.clone(), record);
        self.push(break_at, world.epoch(), Action::Break { id: id.clone() });
        debug!(entity = %id, break_at, "breakable scheduled");
        BreakOutcome::Scheduled { break_at }
    }

    fn push(&mut self, fire_at: u64, epoch: u64, action: Action) {
        self.seq += 1;
        self.schedule.push(Scheduled {
            fire_at,
            seq: self.seq,
            epoch,
            action,
        });
    }

    /// Fire every entry due at or before the current time.
    fn drain_due(&mut self, world: &mut World, events: &mut Vec<SimEvent>) {
        while self
            .schedule
            .peek()
            .is_some_and(|next| next.fire_at <= self.now_ms)
        {
            let Some(entry) = self.schedule.pop() else {
                break;
            };
            let stale = entry.epoch != world.epoch();
            match entry.action {
                Action::Break { id } => {
                    let record = self.breaking.remove(&id);
                    if stale {
                        debug!(entity = %id, "break abandoned: world was cleared");
                        continue;
                    }
                    self.fire_break(world, &id, record, entry.fire_at, events);
                }
                Action::Regen { spec } => {
                    if stale {
                        debug!(kind = %spec.kind, "regeneration abandoned: world was cleared");
                        continue;
                    }
                    match world.spawn(spec) {
                        Ok(entity) => {
                            debug!(entity = %entity.id, "breakable regenerated");
                            events.push(SimEvent::EntitySpawned { entity });
                        }
                        Err(err) => {
                            debug!(error = %err, "regeneration skipped");
                        }
                    }
                }
            }
        }
    }

    fn fire_break(
        &mut self,
        world: &mut World,
        id: &EntityId,
        record: Option<BreakingRecord>,
        fired_at: u64,
        events: &mut Vec<SimEvent>,
    ) {
        if world.remove_if_present(id).is_none() {
            debug!(entity = %id, "break target already gone");
            return;
        }
        self.paths.remove(id);
        self.facing.remove(id);
        debug!(entity = %id, "breakable destroyed");
        events.push(SimEvent::EntityDestroyed { id: id.clone() });

        if let Some(record) = record {
            if record.regen_delay > 0 {
                self.push(
                    fired_at.saturating_add(record.regen_delay),
                    world.epoch(),
                    Action::Regen {
                        spec: record.original,
                    },
                );
            }
        }
    }

    // -- tick ----------------------------------------------------------------

    /// Advance by `dt` seconds.
    ///
    /// `players` holds the positions of living players. Returns destroyed,
    /// spawned, and moved events in that order.
    pub fn tick(&mut self, world: &mut World, players: &[Vec3], dt: f64) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if !(dt.is_finite() && dt >= 0.0) {
            return events;
        }
        self.sim_time += dt;
        self.now_ms = (self.sim_time * 1000.0).round() as u64;
        world.set_clock(self.now_ms);

        self.drain_due(world, &mut events);

        let moves = self.plan_paths(world, dt);
        let chase = self.plan_chase(world, players, dt);
        for (id, position) in moves.into_iter().chain(chase) {
            if world.set_position(&id, position) {
                let rotation = self.rotation_for(world, &id);
                events.push(SimEvent::EntityMoved {
                    id,
                    position,
                    rotation,
                });
            }
        }

        self.paths.retain(|id, _| world.contains(id));
        self.facing.retain(|id, _| world.contains(id));

        trace!(
            now_ms = self.now_ms,
            pending = self.schedule.len(),
            breaking = self.breaking.len(),
            events = events.len(),
            "lifecycle tick"
        );
        events
    }

    /// Facing of `id`, or of its group leader.
    fn rotation_for(&self, world: &World, id: &EntityId) -> f64 {
        if let Some(angle) = self.facing.get(id) {
            return *angle;
        }
        world
            .get(id)
            .and_then(|e| e.group_id())
            .and_then(|g| world.group_leader(g))
            .and_then(|leader| self.facing.get(leader))
            .copied()
            .unwrap_or(0.0)
    }

    /// Members that move with `leader`: its group, or just itself.
    fn body_of(world: &World, leader: &EntityId) -> Vec<EntityId> {
        match world.get(leader).and_then(|e| e.group_id()) {
            Some(g) => world.group_members(g).to_vec(),
            None => vec![leader.clone()],
        }
    }

    /// Whether `id` drives its own motion: ungrouped, or the group leader.
    fn leads(world: &World, id: &EntityId) -> bool {
        match world.get(id).and_then(|e| e.group_id()) {
            Some(g) => world.group_leader(g) == Some(id),
            None => true,
        }
    }

    /// Target positions for path followers and their groups.
    fn plan_paths(&mut self, world: &World, dt: f64) -> Vec<(EntityId, Vec3)> {
        let mut out = Vec::new();
        for entity in world.iter() {
            let p = &entity.properties;
            if !p.has_path() || p.chase || !Self::leads(world, &entity.id) {
                continue;
            }
            let (Some(first), Some(last)) = (p.path.first(), p.path.last()) else {
                continue;
            };
            let state = self.paths.entry(entity.id.clone()).or_default();
            state.advance(p.speed_or_default() * dt);
            let next = first.lerp(*last, state.progress);
            let travel = (*last - *first) * state.direction;
            if travel.horizontal_length() > 0.0 {
                self.facing
                    .insert(entity.id.clone(), yaw_towards(travel.x, travel.z));
            }

            let delta = next - entity.position;
            if delta == Vec3::ZERO {
                continue;
            }
            for member in Self::body_of(world, &entity.id) {
                if let Some(m) = world.get(&member) {
                    out.push((member, m.position + delta));
                }
            }
        }
        out
    }

    /// Target positions for chase leaders and their groups.
    fn plan_chase(&mut self, world: &World, players: &[Vec3], dt: f64) -> Vec<(EntityId, Vec3)> {
        let mut out = Vec::new();
        for leader in world.iter() {
            let p = &leader.properties;
            if !p.chase || !Self::leads(world, &leader.id) {
                continue;
            }
            let Some((target, distance)) = nearest(leader.position, players) else {
                continue;
            };
            if distance > p.chase_radius_or_default() || distance <= self.snap_distance {
                continue;
            }
            let step = (p.speed_or_default() * dt).min(distance - self.snap_distance);
            let heading = (target - leader.position).horizontal().normalize_or_zero();
            let delta = heading * step;
            self.facing
                .insert(leader.id.clone(), yaw_towards(heading.x, heading.z));

            for member in Self::body_of(world, &leader.id) {
                if let Some(m) = world.get(&member) {
                    out.push((member, m.position + delta));
                }
            }
        }
        out
    }
}

/// Nearest player on the horizontal plane; the first wins ties.
fn nearest(from: Vec3, players: &[Vec3]) -> Option<(Vec3, f64)> {
    let mut best: Option<(Vec3, f64)> = None;
    for &player in players {
        let d = from.horizontal_distance(player);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((player, d));
        }
    }
    best
}
