//! The collision pass: overlap dispatch, platform resolution, moving-platform
//! carry, and surface effects.

use tracing::trace;

use hopper_world::entity::{Entity, EntityId};
use hopper_world::math::Vec3;
use hopper_world::store::World;

use crate::actor::{Actor, StandingOn};
use crate::behavior::{self, CollisionContext, Outcome, TriggerCooldowns};
use crate::config::MovementConfig;
use crate::context::FrameContext;
use crate::events::{Outbox, ParticleKind, SimEvent};

/// What the pass decided that the caller must still act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionReport {
    /// Entities consumed this frame (collectibles).
    pub removals: Vec<EntityId>,
    /// A lethal contact happened.
    pub lethal: bool,
}

/// Resolve the actor against everything it overlaps after integration.
///
/// `previous_bottom` is the actor's feet height before this frame's
/// integration; landings are judged against it so a fast fall cannot skip
/// past a top face in one frame. Clears grounded state first; a standing
/// contact or the ground plane sets it again. Candidates that disappeared
/// between the broad phase and the lookup are skipped.
pub fn check_collisions(
    actor: &mut Actor,
    previous_bottom: f64,
    world: &World,
    config: &MovementConfig,
    frame: &FrameContext<'_>,
    cooldowns: &mut TriggerCooldowns,
    outbox: &mut Outbox,
) -> CollisionReport {
    let previous = actor.standing_on.take();
    actor.is_grounded = false;

    let half = config.actor_half_extents;
    let candidates = world.collision_candidates(actor.position.x, actor.position.z);

    let mut ctx = CollisionContext {
        actor,
        config,
        phase: frame.phase,
        now_ms: frame.now_ms,
        dt: frame.dt,
        cooldowns,
        outbox,
        removals: Vec::new(),
        lethal: false,
    };

    for id in &candidates {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !ctx.actor.aabb(half).intersects(&entity.aabb()) {
            continue;
        }
        if behavior::dispatch(entity, &mut ctx) == Outcome::Handled {
            continue;
        }
        if entity.kind.is_solid() {
            resolve_platform(ctx.actor, entity, previous_bottom, config);
        }
    }

    let CollisionContext {
        actor,
        outbox,
        removals,
        lethal,
        ..
    } = ctx;

    if frame.floor_is_solid() {
        land_on_ground_plane(actor, half);
    }

    if let Some(standing) = actor.standing_on.clone() {
        if let Some(surface) = world.get(&standing.entity) {
            on_surface(actor, surface, previous.as_ref(), frame.dt, outbox);
        }
    }

    CollisionReport { removals, lethal }
}

/// Land on a platform from above, or push out sideways.
///
/// The actor lands when it is not rising and its feet were within
/// `stand_tolerance` of the top face either before or after integration.
/// Side contacts separate along the horizontal axis with the smaller
/// penetration and zero velocity on that axis. This is a greedy
/// approximation: at corners it can pick the wrong face and jitter.
pub fn resolve_platform(
    actor: &mut Actor,
    platform: &Entity,
    previous_bottom: f64,
    config: &MovementConfig,
) {
    let half = config.actor_half_extents;
    let body = actor.aabb(half);
    let solid = platform.aabb();

    let feet = body.bottom().max(previous_bottom);
    if feet >= solid.top() - config.stand_tolerance && actor.velocity.y <= 0.0 {
        actor.position.y = solid.top() + half.y;
        actor.velocity.y = 0.0;
        actor.is_grounded = true;
        actor.is_jumping = false;
        actor.standing_on = Some(StandingOn {
            entity: platform.id.clone(),
            last_position: platform.position,
        });
        return;
    }

    let overlap = body.overlap(&solid);
    if overlap.x < overlap.z {
        let sign = if actor.position.x < platform.position.x { -1.0 } else { 1.0 };
        actor.position.x += sign * overlap.x;
        actor.velocity.x = 0.0;
    } else {
        let sign = if actor.position.z < platform.position.z { -1.0 } else { 1.0 };
        actor.position.z += sign * overlap.z;
        actor.velocity.z = 0.0;
    }
}

/// Treat y = 0 as a floor.
fn land_on_ground_plane(actor: &mut Actor, half: Vec3) {
    if actor.position.y - half.y < 0.0 && actor.velocity.y <= 0.0 {
        actor.position.y = half.y;
        actor.velocity.y = 0.0;
        actor.is_grounded = true;
        actor.is_jumping = false;
    }
}

/// Moving-platform carry, surface traits, and the breakable step notice.
fn on_surface(
    actor: &mut Actor,
    surface: &Entity,
    previous: Option<&StandingOn>,
    dt: f64,
    outbox: &mut Outbox,
) {
    let same_surface = previous.is_some_and(|p| p.entity == surface.id);

    if same_surface {
        if let Some(prev) = previous {
            // Vertical motion is already absorbed by the standing snap.
            let delta = (surface.position - prev.last_position).horizontal();
            if delta != Vec3::ZERO {
                trace!(entity = %surface.id, dx = delta.x, dz = delta.z, "platform carry");
                actor.position += delta;
            }
        }
    } else {
        outbox.particles(actor.position, ParticleKind::Dust);
        if surface.properties.breakable {
            outbox.emit(SimEvent::PlatformStep {
                entity_id: surface.id.clone(),
            });
        }
    }

    if let Some(push) = surface.properties.conveyor_velocity() {
        actor.position += push.horizontal() * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopper_world::entity::{EntityKind, EntitySpec};
    use hopper_world::properties::{Conveyor, Properties};

    use crate::config::ServerPhysics;
    use crate::context::FloorType;

    fn platform(world: &mut World, position: Vec3, properties: Properties) -> Entity {
        world
            .spawn(
                EntitySpec::new(EntityKind::Platform, position, Vec3::new(4.0, 1.0, 4.0))
                    .with_properties(properties),
            )
            .unwrap()
    }

    fn run(actor: &mut Actor, world: &World, frame: &FrameContext<'_>) -> (CollisionReport, Outbox) {
        let mut outbox = Outbox::new();
        let mut cooldowns = TriggerCooldowns::new();
        let previous_bottom = actor.aabb(MovementConfig::default().actor_half_extents).bottom();
        let report = check_collisions(
            actor,
            previous_bottom,
            world,
            &MovementConfig::default(),
            frame,
            &mut cooldowns,
            &mut outbox,
        );
        (report, outbox)
    }

    fn frame(physics: &ServerPhysics) -> FrameContext<'_> {
        let mut f = FrameContext::new(0.1, 0, physics);
        f.floor = FloorType::None;
        f
    }

    #[test]
    fn lands_on_platform_top() {
        let physics = ServerPhysics::default();
        let mut world = World::new();
        let p = platform(&mut world, Vec3::new(0.0, 5.0, 0.0), Properties::default());

        // Feet slightly below the top face, falling.
        let mut actor = Actor::new(Vec3::new(0.5, 5.5 + 0.9 - 0.2, 0.5));
        actor.velocity.y = -3.0;
        actor.is_jumping = true;
        run(&mut actor, &world, &frame(&physics));

        assert!(actor.is_grounded);
        assert!(!actor.is_jumping);
        assert_eq!(actor.velocity.y, 0.0);
        assert!((actor.position.y - (5.5 + 0.9)).abs() < 1e-12);
        assert_eq!(actor.standing_entity(), Some(&p.id));
    }

    #[test]
    fn fast_fall_lands_on_top_face_it_passed_this_frame() {
        let physics = ServerPhysics::default();
        let mut world = World::new();
        let p = platform(&mut world, Vec3::new(0.0, 5.0, 0.0), Properties::default());
        let config = MovementConfig::default();

        // Feet went from just above the top (5.5) to 1.2 below it.
        let mut actor = Actor::new(Vec3::new(0.5, 4.3 + 0.9, 0.5));
        actor.velocity.y = -36.0;
        let mut outbox = Outbox::new();
        let mut cooldowns = TriggerCooldowns::new();
        check_collisions(
            &mut actor,
            5.6,
            &world,
            &config,
            &frame(&physics),
            &mut cooldowns,
            &mut outbox,
        );

        assert!(actor.is_grounded);
        assert_eq!(actor.velocity.y, 0.0);
        assert!((actor.position.y - (5.5 + 0.9)).abs() < 1e-12);
        assert_eq!(actor.position.x, 0.5);
        assert_eq!(actor.standing_entity(), Some(&p.id));
    }

    #[test]
    fn rising_through_side_pushes_out_on_smaller_axis() {
        let physics = ServerPhysics::default();
        let mut world = World::new();
        platform(&mut world, Vec3::new(0.0, 0.5, 0.0), Properties::default());

        // Overlapping the +X face by 0.1, well inside on Z.
        let mut actor = Actor::new(Vec3::new(2.25, 0.9, 0.0));
        actor.velocity = Vec3::new(-5.0, 2.0, 1.0);
        run(&mut actor, &world, &frame(&physics));

        assert!(!actor.is_grounded);
        assert!((actor.position.x - 2.35).abs() < 1e-9);
        assert_eq!(actor.velocity.x, 0.0);
        assert_eq!(actor.velocity.z, 1.0);
    }

    #[test]
    fn ground_plane_only_when_floor_is_solid() {
        let physics = ServerPhysics::default();
        let world = World::new();

        let mut actor = Actor::new(Vec3::new(0.0, 0.5, 0.0));
        actor.velocity.y = -1.0;
        run(&mut actor, &world, &frame(&physics));
        assert!(!actor.is_grounded);

        let solid = FrameContext::new(0.1, 0, &physics);
        run(&mut actor, &world, &solid);
        assert!(actor.is_grounded);
        assert_eq!(actor.position.y, 0.9);
    }

    #[test]
    fn carry_follows_platform_delta() {
        let physics = ServerPhysics::default();
        let mut world = World::new();
        let p = platform(
            &mut world,
            Vec3::new(0.0, 0.5, 0.0),
            Properties {
                kinematic: true,
                ..Default::default()
            },
        );
        let mut actor = Actor::new(Vec3::new(0.0, 1.85, 0.0));
        let f = frame(&physics);
        run(&mut actor, &world, &f);
        assert_eq!(actor.standing_entity(), Some(&p.id));

        world.set_position(&p.id, Vec3::new(0.5, 0.5, -0.25));
        actor.position.y -= 0.05;
        run(&mut actor, &world, &f);
        assert!((actor.position.x - 0.5).abs() < 1e-12);
        assert!((actor.position.z + 0.25).abs() < 1e-12);
    }

    #[test]
    fn conveyor_pushes_standing_actor() {
        let physics = ServerPhysics::default();
        let mut world = World::new();
        platform(
            &mut world,
            Vec3::new(0.0, 0.5, 0.0),
            Properties {
                conveyor: Some(Conveyor {
                    dir: Vec3::new(0.0, 0.0, 2.0),
                    speed: Some(3.0),
                }),
                ..Default::default()
            },
        );
        let mut actor = Actor::new(Vec3::new(0.0, 1.85, 0.0));
        run(&mut actor, &world, &frame(&physics));
        assert!((actor.position.z - 0.3).abs() < 1e-12);
    }

    #[test]
    fn first_step_on_breakable_notifies_once() {
        let physics = ServerPhysics::default();
        let mut world = World::new();
        let p = platform(
            &mut world,
            Vec3::new(0.0, 0.5, 0.0),
            Properties {
                breakable: true,
                ..Default::default()
            },
        );
        let mut actor = Actor::new(Vec3::new(0.0, 1.85, 0.0));
        let f = frame(&physics);
        let (_, first) = run(&mut actor, &world, &f);
        actor.position.y -= 0.05;
        let (_, second) = run(&mut actor, &world, &f);
        assert_eq!(
            first.events,
            vec![SimEvent::PlatformStep {
                entity_id: p.id.clone()
            }]
        );
        assert!(second.events.is_empty());
    }

    #[test]
    fn collectible_is_reported_for_removal() {
        let physics = ServerPhysics::default();
        let mut world = World::new();
        let coin = world
            .spawn(EntitySpec::new(
                EntityKind::Collectible,
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(1.0, 1.0, 1.0),
            ))
            .unwrap();
        let mut actor = Actor::new(Vec3::new(0.0, 2.0, 0.0));
        let (report, outbox) = run(&mut actor, &world, &frame(&physics));
        assert_eq!(report.removals, vec![coin.id.clone()]);
        assert!(!report.lethal);
        assert_eq!(outbox.events.len(), 1);
    }
}
