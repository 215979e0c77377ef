//! Volley Match Server - authoritative match host
//!
//! Starts the configured number of bot matches, each on its own worker
//! task, and writes their recordings when the matches end or the process
//! is asked to stop.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use volley_match_server::config::Config;
use volley_match_server::game::field::{PlayerSlot, Side};
use volley_match_server::host::{run_bot, MatchConfig, MatchHost, SeatConfig};
use volley_match_server::replay::ReplayRecorder;
use volley_match_server::util::time::{format_unix_seconds, unix_seconds};

const BOT_COLORS: [u32; 4] = [0x2e86de, 0xee5253, 0x10ac84, 0xff9f43];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Volley Match Server");
    info!(
        game_speed = config.game_speed,
        rules = %config.rules,
        score_to_win = config.score_to_win,
        matches = config.demo_matches,
        "Match settings"
    );

    let host = MatchHost::new();
    let base_seed = config.match_seed.unwrap_or_else(rand::random);

    for n in 0..config.demo_matches {
        let seats = demo_seats(config.players_per_team);
        let (handle, receivers) = host.spawn(MatchConfig {
            game_speed: config.game_speed,
            rules: config.rules.clone(),
            score_to_win: config.score_to_win,
            chat_rate_limit: config.chat_rate_limit,
            seats,
        })?;

        for (slot, rx) in receivers {
            let seed = base_seed.wrapping_add((n * 4 + slot.index()) as u64);
            let handle = handle.clone();
            tokio::spawn(async move {
                let id = handle.id;
                let report = run_bot(handle, slot, rx, seed).await;
                info!(match_id = %id, slot = ?slot, updates = report.updates, won = ?report.won, "Bot left");
            });
        }
    }

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = host.wait_idle() => {
            info!("All matches ended");
        }
    }

    let recordings = host.shutdown().await;
    for (id, recorder) in &recordings {
        match write_replay(&config.replay_dir, *id, recorder) {
            Ok(path) => info!(match_id = %id, path = %path, "Replay saved"),
            Err(err) => warn!(match_id = %id, error = %err, "Failed to save replay"),
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Both teams filled up to `per_team`; right-side seats play mirrored
fn demo_seats(per_team: usize) -> Vec<SeatConfig> {
    PlayerSlot::ALL
        .into_iter()
        .take(per_team * 2)
        .map(|slot| SeatConfig {
            slot,
            name: format!("bot_{}", slot.prefix()),
            color: BOT_COLORS[slot.index()],
            switched_side: slot.side() == Side::Right,
        })
        .collect()
}

fn write_replay(dir: &Path, id: Uuid, recorder: &ReplayRecorder) -> anyhow::Result<String> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating replay directory {}", dir.display()))?;

    let name = format!("{}_{}.vrep", format_unix_seconds(unix_seconds()), id);
    let path = dir.join(name);
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    recorder.save(BufWriter::new(file))?;
    Ok(path.display().to_string())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
