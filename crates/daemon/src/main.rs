// SPDX-License-Identifier: MIT

//! `morphicd`: the long-lived process that owns the tick engine and the
//! evolution pipeline's agents, serves the IPC socket `morphic` talks to,
//! and broadcasts world frames over WebSocket (spec.md §4, §6).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mp_bus::{new_in_process_bus, EventBus};
use mp_core::{Config, Event, SystemClock, TelemetryPayload, WorldSnapshot};
use mp_daemon::{env, restore, ListenCtx, Listener, Stats, Supervisor, UnconfiguredLlmClient};
use mp_evolution::{Architect, Coder, Gatekeeper, LlmClient, Patcher, Watcher};
use mp_net::{encode_frame, TriggerApi, WebSocketBroadcaster, WorldBroadcaster};
use mp_sim::{Registry, Rng, TickEngine, World};
use mp_storage::{CacheExt, CheckpointStore, CycleStore, FsCache, FsDurableStore, MutationStore};
use tokio_util::sync::CancellationToken;

fn init_logging(state_dir: &std::path::Path) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(state_dir)?;
    let file_appender = tracing_appender::rolling::daily(state_dir, "morphicd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(non_blocking).with_ansi(false).init();
    Ok(guard)
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state_dir = env::state_dir();
    let _log_guard = init_logging(&state_dir)?;

    let config = Config::from_env().context("loading configuration")?;

    let durable = Arc::new(FsDurableStore::new(state_dir.join("store")).context("opening durable store")?);
    let mutation_store = Arc::new(MutationStore::new(durable.clone()));
    let cycle_store = Arc::new(CycleStore::new(durable.clone()));
    let checkpoint_store = Arc::new(CheckpointStore::new(durable));
    let snapshot_cache = Arc::new(FsCache::new(state_dir.join("cache")).context("opening snapshot cache")?);

    let bus = new_in_process_bus();
    let registry = Arc::new(Registry::new(config.max_trait_versions_kept));

    let mut world = World::new(Rng::from_entropy());
    let starting_tick = match checkpoint_store.load_latest().context("loading checkpoint")? {
        Some(checkpoint) => {
            tracing::info!(tick = checkpoint.tick, "restoring from checkpoint");
            let tick = checkpoint.tick;
            restore::restore(&mut world, &registry, &config.mutations_dir, &checkpoint);
            tick
        }
        None => {
            tracing::info!("no checkpoint found, starting fresh");
            world.seed(&config);
            0
        }
    };

    let mut engine = TickEngine::new(config.clone(), registry.clone(), world);
    engine.set_tick_number(starting_tick);

    let llm: Arc<dyn LlmClient> = Arc::new(UnconfiguredLlmClient);
    let watcher = Arc::new(Watcher::new(bus.clone(), config.clone(), SystemClock));
    let architect = Arc::new(Architect::new(bus.clone(), cycle_store.clone(), llm.clone(), config.cycle_lock_ttl()));
    let coder = Arc::new(Coder::new(bus.clone(), mutation_store.clone(), llm, config.mutations_dir.clone()));
    let patcher = Arc::new(Patcher::new(bus.clone(), registry.clone(), mutation_store.clone(), cycle_store.clone()));
    let gatekeeper = Arc::new(Gatekeeper::new(bus.clone(), mutation_store, config.mutations_dir.clone()));
    let gatekeeper_for_run = gatekeeper.clone();
    let trigger_api = Arc::new(TriggerApi::new(bus.clone(), gatekeeper));
    let broadcaster = Arc::new(WebSocketBroadcaster::new(1024));

    let shutdown = CancellationToken::new();
    let tick_counter = Arc::new(AtomicU64::new(starting_tick));
    let mutation_counter = Arc::new(AtomicU64::new(0));
    let stats = Arc::new(Stats::new());
    stats.tick.store(starting_tick, Ordering::Relaxed);

    let listen_ctx = Arc::new(ListenCtx {
        registry: registry.clone(),
        cycle_store,
        checkpoint_store: checkpoint_store.clone(),
        trigger_api,
        stats: stats.clone(),
        shutdown: shutdown.clone(),
    });
    let socket_path = env::socket_path();
    let ipc_listener = Listener::bind(&socket_path, listen_ctx).context("binding ipc socket")?;

    let mut tasks = tokio::task::JoinSet::new();
    tasks.spawn({
        let shutdown = shutdown.clone();
        async move { ipc_listener.serve(shutdown).await }
    });
    tasks.spawn({
        let broadcaster = broadcaster.clone();
        let addr = env::ws_bind_addr();
        async move {
            if let Err(err) = broadcaster.serve(addr).await {
                tracing::error!(error = %err, "websocket broadcaster exited");
            }
        }
    });
    tasks.spawn(async move { watcher.run().await });
    tasks.spawn(async move { architect.run(SystemClock).await });
    tasks.spawn(async move { coder.run().await });
    let patcher_for_stats = patcher.clone();
    tasks.spawn(async move { patcher.run(SystemClock).await });
    tasks.spawn(async move { gatekeeper_for_run.run().await });
    tasks.spawn(Supervisor::new(tick_counter.clone(), mutation_counter.clone(), shutdown.clone()).run());

    let tick_loop = tokio::spawn(run_tick_loop(
        engine,
        bus,
        checkpoint_store,
        registry,
        config,
        broadcaster,
        snapshot_cache,
        tick_counter,
        mutation_counter,
        patcher_for_stats,
        stats,
        shutdown.clone(),
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
        _ = shutdown.cancelled() => {
            tracing::info!("soft restart requested shutdown");
        }
    }
    shutdown.cancel();

    let _ = tokio::time::timeout(env::drain_timeout(), tick_loop).await;
    tasks.shutdown().await;
    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_tick_loop(
    mut engine: TickEngine,
    bus: Arc<dyn EventBus>,
    checkpoint_store: Arc<CheckpointStore>,
    registry: Arc<Registry>,
    config: Config,
    broadcaster: Arc<WebSocketBroadcaster>,
    snapshot_cache: Arc<FsCache>,
    tick_counter: Arc<AtomicU64>,
    mutation_counter: Arc<AtomicU64>,
    patcher: Arc<Patcher>,
    stats: Arc<Stats>,
    shutdown: CancellationToken,
) {
    while !shutdown.is_cancelled() {
        let now_epoch_ms = epoch_ms();
        let outcome = engine.tick(now_epoch_ms);
        tick_counter.store(outcome.tick, Ordering::Relaxed);
        stats.tick.store(outcome.tick, Ordering::Relaxed);
        stats.predator_kills.store(engine.world.predator_kills, Ordering::Relaxed);
        stats.virus_kills.store(engine.world.virus_kills, Ordering::Relaxed);
        stats.predator_deaths.store(engine.world.predator_deaths, Ordering::Relaxed);
        let mutations_applied = patcher.mutations_applied();
        stats.mutations_applied.store(mutations_applied, Ordering::Relaxed);
        mutation_counter.store(mutations_applied, Ordering::Relaxed);

        if let Some(snapshot) = &outcome.snapshot {
            let payload = TelemetryPayload {
                tick: snapshot.tick,
                entity_count: snapshot.entity_count,
                avg_energy: snapshot.avg_energy,
                resource_count: snapshot.resource_count,
                death_stats: snapshot.death_stats.clone(),
            };
            let _ = bus.publish(Event::Telemetry(payload));
            let _ = snapshot_cache.set(&WorldSnapshot::cache_key(snapshot.tick), snapshot, Duration::from_secs(3600));
        }

        if outcome.should_broadcast {
            let entities: Vec<_> = engine.world.entities.iter().filter(|e| e.is_alive()).cloned().collect();
            let resources: Vec<_> = engine.world.environment.iter().cloned().collect();
            let frame = encode_frame(outcome.tick as u32, &entities, &resources);
            broadcaster.broadcast(frame);
        }

        if outcome.should_checkpoint {
            let checkpoint = restore::build_checkpoint(&engine.world, &registry, &config, outcome.tick, now_epoch_ms);
            if let Err(err) = checkpoint_store.save(&checkpoint) {
                tracing::warn!(error = %err, "failed to save checkpoint");
            }
        }

        if outcome.overran_budget {
            tracing::warn!(
                tick = outcome.tick,
                duration_ms = outcome.tick_duration.as_millis() as u64,
                "tick overran its budget"
            );
        }

        let remaining = config.tick_rate().checked_sub(outcome.tick_duration).unwrap_or_default();
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }
}
