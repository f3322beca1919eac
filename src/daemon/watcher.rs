use super::config::Config;
use super::updater::Updater;
use log::{info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

fn check_interval(config: &Config) -> Duration {
    if config.update.check_interval == 0 {
        warn!("checkInterval is 0, using 1 second");
    }
    Duration::from_secs(config.update.check_interval.max(1))
}

fn ticker(period: Duration, start: Instant) -> Interval {
    let mut interval = time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Scheduler loop: the first tick fires immediately, later ticks every
/// check interval. A tick that came due while a cycle was running is
/// skipped, and a running cycle always completes before `shutdown` is
/// honoured.
pub async fn watch<F>(updater: &Updater, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut period = check_interval(&updater.config());
    let mut interval = ticker(period, Instant::now());
    let mut last_finished: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutting down updater");
                return;
            }
            scheduled = interval.tick() => {
                if last_finished.is_some_and(|done| scheduled < done) {
                    warn!("Previous update check overran the interval, skipping this one");
                    continue;
                }
                info!("Running scheduled update check...");
                if updater.try_check_for_updates().await.is_none() {
                    warn!("Previous update check still running, skipping this one");
                    continue;
                }
                last_finished = Some(Instant::now());

                let next = check_interval(&updater.config());
                if next != period {
                    info!("Check interval changed to {} seconds", next.as_secs());
                    period = next;
                    interval = ticker(period, Instant::now() + period);
                }
                info!("Update check completed. Next check in {} seconds.", period.as_secs());
            }
        }
    }
}
