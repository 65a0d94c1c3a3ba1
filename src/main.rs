use anyhow::{Context, Result};
use karaoke_lib::config::{default_config_path, KaraokeConfig};
use karaoke_lib::models::QueueItem;
use karaoke_lib::KaraokeApp;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = default_config_path()
        .map(|path| KaraokeConfig::load_or_default(&path))
        .unwrap_or_default()
        .with_env_overrides();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run_monitor(config))
}

fn describe(item: &Option<QueueItem>) -> String {
    match item {
        Some(item) => format!(
            "'{}' by {} ({})",
            item.track.title, item.track.channel_title, item.mode
        ),
        None => "nothing".to_string(),
    }
}

/// Headless second screen: follows the shared queue and logs what is
/// playing until interrupted.
async fn run_monitor(config: KaraokeConfig) -> Result<()> {
    let poll = config.monitor_poll();
    let app = KaraokeApp::open(config)
        .await
        .context("Failed to open karaoke store")?;

    let mut notices = app.notifier.subscribe();
    let mirror = app.mirror();
    mirror
        .refresh()
        .await
        .context("Failed to read the queue")?;

    let mut now_playing = mirror.watch_now_playing();
    log::info!("[Monitor] Now playing: {}", describe(&mirror.now_playing()));
    let follower = mirror.clone().spawn(poll);

    loop {
        tokio::select! {
            changed = now_playing.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = now_playing.borrow_and_update().clone();
                log::info!("[Monitor] Now playing: {}", describe(&current));
                log::info!("[Monitor] Up next: {} songs", mirror.up_next().len());
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    log::info!("[Monitor] {}: {}", notice.title, notice.message);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("[Monitor] Interrupted, shutting down");
                break;
            }
        }
    }

    follower.abort();
    Ok(())
}
