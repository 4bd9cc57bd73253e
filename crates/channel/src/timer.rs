//! Named, cancellable scheduled tasks.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Holds at most one outstanding task of a kind.  Arming a new one aborts
/// the previous one.
#[derive(Debug, Default)]
pub(crate) struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.handle = Some(tokio::spawn(fut));
    }

    /// Run `fire` once `delay` has elapsed.
    pub fn arm<F>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
    }

    /// Abort the outstanding task, if any.  Returns whether one existed.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(h) => {
                h.abort();
                true
            }
            None => false,
        }
    }

    /// Forget the task without aborting it (it has just fired).
    pub fn clear(&mut self) {
        self.handle = None;
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn rearming_cancels_previous() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut slot = TaskSlot::default();

        let f = fired.clone();
        slot.arm(Duration::from_secs(10), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let f = fired.clone();
        slot.arm(Duration::from_secs(10), move || {
            f.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut slot = TaskSlot::default();
        let f = fired.clone();
        slot.arm(Duration::from_secs(1), move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        assert!(slot.is_armed());
        assert!(slot.cancel());
        assert!(!slot.is_armed());
        assert!(!slot.cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
