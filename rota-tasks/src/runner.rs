use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// One independently schedulable background task. Each tick takes its own
/// config/settings snapshot; nothing is read from ambient global state.
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    fn name(&self) -> &'static str;
    async fn tick(&self);
}

/// Drive a task on a fixed interval until the shutdown signal flips.
///
/// Shutdown is cooperative: a tick that is already running finishes before
/// the loop exits. A dropped sender counts as shutdown.
pub async fn run_periodic(
    task: Arc<dyn PeriodicTask>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        task = task.name(),
        period_secs = every.as_secs(),
        "background task started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                task.tick().await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(task = task.name(), "background task stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl PeriodicTask for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn tick(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let task = Arc::new(Counter {
            ticks: AtomicUsize::new(0),
        });
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run_periodic(
            task.clone(),
            Duration::from_millis(10),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(35)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        let seen = task.ticks.load(Ordering::SeqCst);
        assert!(seen >= 1, "task never ticked");

        // No further ticks after shutdown.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(task.ticks.load(Ordering::SeqCst), seen);
    }
}
