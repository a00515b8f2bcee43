use std::time::Duration;

use sysinfo::System;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Periodically samples host memory and warns when usage crosses a threshold.
pub struct MemoryMonitor {
    interval: Duration,
    warn_percent: f64,
}

impl MemoryMonitor {
    pub fn new(interval: Duration, warn_percent: f64) -> Self {
        Self {
            interval,
            warn_percent,
        }
    }

    /// Run the monitor until `cancel` fires. The returned handle resolves
    /// once the loop has exited.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut system = System::new();
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                system.refresh_memory();
                let percent = usage_percent(system.used_memory(), system.total_memory());
                if percent > self.warn_percent {
                    warn!("Memory usage is high: {percent:.1}%");
                }
            }
        })
    }
}

/// Used memory as a percentage of total. Returns 0 when the total is
/// unknown, so a misreporting host never trips the warning.
pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_percent_basics() {
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(512, 1024), 50.0);
        assert_eq!(usage_percent(1024, 1024), 100.0);
    }

    #[test]
    fn usage_percent_detects_high_usage() {
        let percent = usage_percent(95, 100);
        assert!(percent > 90.0);

        let percent = usage_percent(90, 100);
        assert!(percent <= 90.0);
    }

    #[tokio::test]
    async fn monitor_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let handle =
            MemoryMonitor::new(Duration::from_secs(3600), 90.0).spawn(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("monitor should exit promptly after cancel")
            .unwrap();
    }
}
