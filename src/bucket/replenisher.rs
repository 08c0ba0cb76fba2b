//! Background task that refills an operation's quota every window.

use std::sync::Weak;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::operation::OperationId;
use super::registration::Registration;
use super::registry::Counters;

/// Outcome of a single replenisher tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    /// The counter was reset to the full rate
    Refilled,
    /// The registration is gone; the task must exit
    Stop,
}

/// Spawn the replenisher for one registration.
///
/// The task holds only a weak reference to the registry so that dropping the
/// bucket also ends its replenishers.
pub(super) fn spawn(
    runtime: &Handle,
    counters: Weak<Mutex<Counters>>,
    id: OperationId,
    generation: u64,
    registration: Registration,
) {
    runtime.spawn(run(counters, id, generation, registration));
}

async fn run(
    counters: Weak<Mutex<Counters>>,
    id: OperationId,
    generation: u64,
    registration: Registration,
) {
    let window = registration.window();
    let Some(start) = Instant::now().checked_add(window) else {
        // The first window never ends, so there is nothing to reset
        debug!(operation = %id, window_secs = registration.window_secs, "Replenisher not scheduled");
        return;
    };
    let mut interval = time::interval_at(start, window);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if tick(&counters, &id, generation, registration.rate) == Tick::Stop {
            debug!(operation = %id, generation, "Replenisher stopped");
            return;
        }
        trace!(operation = %id, rate = registration.rate, "Replenished operation");
    }
}

/// Reset the counter if the registration this task belongs to is still live.
fn tick(counters: &Weak<Mutex<Counters>>, id: &OperationId, generation: u64, rate: u64) -> Tick {
    let Some(counters) = counters.upgrade() else {
        return Tick::Stop;
    };

    let refilled = counters.lock().refill(id, generation, rate);
    if refilled {
        Tick::Refilled
    } else {
        Tick::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_tick_stops_when_bucket_dropped() {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let weak = Arc::downgrade(&counters);
        drop(counters);

        let id = OperationId::from("registered");
        assert_eq!(tick(&weak, &id, 0, 10), Tick::Stop);
    }

    #[test]
    fn test_tick_stops_when_unregistered() {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let weak = Arc::downgrade(&counters);

        let id = OperationId::from("registered");
        assert_eq!(tick(&weak, &id, 0, 10), Tick::Stop);
    }

    #[test]
    fn test_tick_refills_own_generation() {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let id = OperationId::from("registered");
        let generation = counters.lock().insert(&id, 10).unwrap();

        assert_eq!(tick(&Arc::downgrade(&counters), &id, generation, 10), Tick::Refilled);
    }

    #[test]
    fn test_tick_stops_on_newer_generation() {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let id = OperationId::from("registered");
        let stale = counters.lock().insert(&id, 10).unwrap();
        counters.lock().remove("registered");
        counters.lock().insert(&id, 3).unwrap();

        assert_eq!(tick(&Arc::downgrade(&counters), &id, stale, 10), Tick::Stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_exits_after_unregister() {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let id = OperationId::from("registered");
        let generation = counters.lock().insert(&id, 1).unwrap();
        let registration = Registration::new(1, 1).unwrap();

        let task = tokio::spawn(run(Arc::downgrade(&counters), id, generation, registration));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(!task.is_finished());

        counters.lock().remove("registered");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_exits_after_bucket_dropped() {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let id = OperationId::from("registered");
        let generation = counters.lock().insert(&id, 1).unwrap();
        let registration = Registration::new(1, 1).unwrap();

        let task = tokio::spawn(run(Arc::downgrade(&counters), id, generation, registration));
        drop(counters);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(task.is_finished());
    }

    #[tokio::test]
    async fn test_task_with_unreachable_window_exits_cleanly() {
        let counters = Arc::new(Mutex::new(Counters::default()));
        let id = OperationId::from("registered");
        let generation = counters.lock().insert(&id, 1).unwrap();
        let registration = Registration::new(1, u64::MAX).unwrap();

        let task = tokio::spawn(run(Arc::downgrade(&counters), id, generation, registration));

        // A panicking task would surface as a join error here
        task.await.unwrap();
        assert!(counters.lock().refill(&OperationId::from("registered"), generation, 1));
    }
}
