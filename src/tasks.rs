use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
#[cfg(test)]
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Background jobs for one screen. Each job runs on its own thread and its
/// result comes back through `drain`. Results of jobs started before the
/// last `cancel_all` are dropped instead of delivered.
pub struct Tasks<M> {
    tx: Sender<(CancellationToken, M)>,
    rx: Receiver<(CancellationToken, M)>,
    token: CancellationToken,
    in_flight: Arc<AtomicUsize>,
}

impl<M: Send + 'static> Tasks<M> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            token: CancellationToken::new(),
            in_flight: Arc::default(),
        }
    }

    pub fn spawn<F>(&self, name: &'static str, job: F)
    where
        F: FnOnce() -> M + Send + 'static,
    {
        let token = self.token.clone();
        let tx = self.tx.clone();
        let in_flight = self.in_flight.clone();
        in_flight.fetch_add(1, Ordering::SeqCst);

        thread::spawn(move || {
            let message = job();
            in_flight.fetch_sub(1, Ordering::SeqCst);
            if token.is_cancelled() {
                debug!(task = name, "discarding result of cancelled task");
                return;
            }
            // Receiver gone means the screen is gone
            let _ = tx.send((token, message));
        });
    }

    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn drain(&self) -> Vec<M> {
        self.rx
            .try_iter()
            .filter(|(token, _)| !token.is_cancelled())
            .map(|(_, message)| message)
            .collect()
    }

    /// Blocks for at most `timeout` waiting for the next live result.
    #[cfg(test)]
    pub fn wait(&self, timeout: Duration) -> Option<M> {
        let deadline = Instant::now() + timeout;
        loop {
            let left = deadline.checked_duration_since(Instant::now())?;
            match self.rx.recv_timeout(left) {
                Ok((token, message)) if !token.is_cancelled() => return Some(message),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn cancel_all(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
    }
}

impl<M: Send + 'static> Default for Tasks<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Drop for Tasks<M> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn test_result_is_delivered() {
        let tasks: Tasks<u32> = Tasks::new();
        tasks.spawn("answer", || 42);
        assert_eq!(tasks.wait(Duration::from_secs(5)), Some(42));
    }

    #[test]
    fn test_cancelled_results_are_dropped() {
        let mut tasks: Tasks<&'static str> = Tasks::new();
        let (release_tx, release_rx) = sync_channel::<()>(0);

        tasks.spawn("stale", move || {
            let _ = release_rx.recv();
            "stale"
        });
        tasks.cancel_all();
        tasks.spawn("fresh", || "fresh");

        assert_eq!(tasks.wait(Duration::from_secs(5)), Some("fresh"));
        release_tx.send(()).unwrap();

        // Give the stale job time to finish; its result must never show up
        thread::sleep(Duration::from_millis(50));
        assert!(tasks.drain().is_empty());
        assert_eq!(tasks.wait(Duration::from_millis(50)), None);
    }

    #[test]
    fn test_pending_counts_running_jobs() {
        let tasks: Tasks<()> = Tasks::new();
        let (release_tx, release_rx) = sync_channel::<()>(0);
        tasks.spawn("blocked", move || {
            let _ = release_rx.recv();
        });
        assert_eq!(tasks.pending(), 1);

        release_tx.send(()).unwrap();
        assert_eq!(tasks.wait(Duration::from_secs(5)), Some(()));
        assert_eq!(tasks.pending(), 0);
    }
}
