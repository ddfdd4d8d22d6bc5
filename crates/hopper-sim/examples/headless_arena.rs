//! Headless arena demo: one actor runs across a small course while the server
//! loop breaks platforms, moves a lift, and sends a chaser after the actor.
//!
//! Run with:
//!   cargo run --example headless_arena -p hopper-sim
//!
//! Set `RUST_LOG=hopper_sim=debug` to watch the lifecycle events.

use hopper_sim::prelude::*;
use tracing::info;

const FRAME_DT: f64 = 1.0 / 60.0;
const SECONDS: u64 = 12;

fn build_course(server: &mut ServerTick) -> Result<(), anyhow::Error> {
    // Start pad.
    server.spawn(EntitySpec::new(
        EntityKind::Platform,
        Vec3::new(0.0, 0.5, 0.0),
        Vec3::new(6.0, 1.0, 6.0),
    ))?;

    // A row of breakable stepping stones heading down -Z.
    for i in 1..=4 {
        server.spawn(
            EntitySpec::new(
                EntityKind::Platform,
                Vec3::new(0.0, 0.5, -6.0 * i as f64),
                Vec3::new(4.0, 1.0, 4.0),
            )
            .with_properties(Properties {
                breakable: true,
                break_delay: Some(600),
                regen_delay: Some(2500),
                ..Default::default()
            }),
        )?;
    }

    // Coins along the way.
    for i in 0..5 {
        server.spawn(EntitySpec::new(
            EntityKind::Collectible,
            Vec3::new(0.0, 1.5, -3.0 - 5.0 * i as f64),
            Vec3::new(0.6, 0.6, 0.6),
        ))?;
    }

    // A lift shuttling sideways at the far end.
    server.spawn(
        EntitySpec::new(
            EntityKind::Platform,
            Vec3::new(-6.0, 0.5, -30.0),
            Vec3::new(4.0, 0.5, 4.0),
        )
        .with_properties(Properties {
            kinematic: true,
            path: vec![Vec3::new(-6.0, 0.5, -30.0), Vec3::new(6.0, 0.5, -30.0)],
            speed: Some(0.25),
            ..Default::default()
        }),
    )?;

    // A two-part chaser.
    for offset in [0.0, 1.2] {
        server.spawn(
            EntitySpec::new(
                EntityKind::Obstacle,
                Vec3::new(12.0 + offset, 0.75, -12.0),
                Vec3::new(1.0, 1.5, 1.0),
            )
            .with_properties(Properties {
                chase: true,
                speed: Some(2.0),
                group_id: Some("hound".into()),
                ..Default::default()
            }),
        )?;
    }

    // Goal at the end of the course.
    server.spawn(
        EntitySpec::new(
            EntityKind::Trigger,
            Vec3::new(0.0, 1.5, -36.0),
            Vec3::new(3.0, 3.0, 3.0),
        )
        .with_properties(Properties {
            is_goal: true,
            ..Default::default()
        }),
    )?;
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let tick_config = TickConfig::default();
    let server_interval_ms = (tick_config.fixed_dt * 1000.0).round() as u64;
    let mut server = ServerTick::new(World::new(), tick_config)?;
    build_course(&mut server)?;

    let physics = ServerPhysics::from_json_str(r#"{ "gravity": -9.81, "speedScale": 1.0 }"#)?;
    let config = MovementConfig::default();
    config.validate()?;
    let mut player = PlayerSim::new(Vec3::new(0.0, 2.0, 0.0), config);

    // The client keeps its own copy of the world, synced from a snapshot.
    let mut client_world = World::new();
    client_world.restore_snapshot(&server.snapshot())?;

    let mut collected = 0;
    let mut deaths = 0;
    let mut next_server_ms = server_interval_ms;
    let mut position_sends = 0;
    let frames = SECONDS * 60;

    for frame_index in 0..frames {
        let now_ms = (frame_index as f64 * FRAME_DT * 1000.0) as u64;

        // Run forward, hopping every second.
        let input = InputState {
            w: true,
            shift: frame_index % 60 < 30,
            space: frame_index % 60 == 10,
            ..Default::default()
        };
        let mut ctx = FrameContext::new(FRAME_DT, now_ms, &physics);
        ctx.floor = FloorType::Lava;
        ctx.respawn_point = Vec3::new(0.0, 2.0, 0.0);

        let out = player.step(&mut client_world, &input, &ctx);
        for event in &out.events {
            match event {
                SimEvent::Collected { entity_id } => {
                    collected += 1;
                    if let Err(err) = server.destroy(entity_id) {
                        info!(entity = %entity_id, error = %err, "collectible already gone");
                    }
                }
                SimEvent::Died { .. } => deaths += 1,
                SimEvent::PlatformStep { entity_id } => {
                    let outcome = server.trigger_break(entity_id);
                    info!(entity = %entity_id, ?outcome, "platform step");
                }
                SimEvent::GoalReached { entity_id } => info!(entity = %entity_id, "goal reached"),
                _ => {}
            }
        }
        if player.position_update(now_ms).is_some() {
            position_sends += 1;
        }

        while now_ms >= next_server_ms {
            let players: Vec<Vec3> = if player.actor().is_alive() {
                vec![player.actor().position]
            } else {
                Vec::new()
            };
            let events = server.tick(&players);
            if !events.is_empty() {
                // Resync the client copy whenever the server changed something.
                client_world.restore_snapshot(&server.snapshot())?;
            }
            next_server_ms += server_interval_ms;
        }
    }

    let state = player.actor().state();
    println!("simulated {SECONDS}s: {} server ticks", server.tick_count());
    println!(
        "actor at ({:.2}, {:.2}, {:.2}), grounded: {}",
        state.position.x, state.position.y, state.position.z, state.is_grounded
    );
    println!("collected {collected}, died {deaths} times, {position_sends} position sends");
    println!(
        "server world: {} entities, hash {}",
        server.world().len(),
        server.world().state_hash()
    );
    Ok(())
}
