//! Per-iteration fault boundary.
//!
//! Background loops run each tick through [`guarded`]. A panic inside the
//! tick is caught and logged; the loop carries on with its next tick.

use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::broadcast;
use tokio::time::Interval;

/// Run one iteration of a background loop, trapping panics.
///
/// Returns `None` if the iteration panicked.
pub async fn guarded<F, T>(task: &'static str, fut: F) -> Option<T>
where
    F: Future<Output = T>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(value) => Some(value),
        Err(payload) => {
            tracing::error!(
                task,
                panic = %panic_message(payload.as_ref()),
                "Iteration panicked; continuing with next tick"
            );
            None
        }
    }
}

/// Call `tick` on every `ticker` tick until `shutdown` fires.
///
/// Each call goes through [`guarded`], so one panicking tick is logged and
/// the following tick still runs.
pub async fn run_ticks<F, Fut>(
    task: &'static str,
    mut ticker: Interval,
    mut shutdown: broadcast::Receiver<()>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future,
{
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                guarded(task, tick()).await;
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Best-effort extraction of a panic payload's message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_passes_value_through() {
        assert_eq!(guarded("test", async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let result: Option<()> = guarded("test", async {
            panic!("boom");
        })
        .await;
        assert_eq!(result, None);

        // the caller keeps running afterwards
        assert_eq!(guarded("test", async { "next tick" }).await, Some("next tick"));
    }

    #[tokio::test]
    async fn test_loop_keeps_ticking_after_a_panic() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = broadcast::channel(1);
        let ticker = tokio::time::interval(Duration::from_millis(10));

        let counter = calls.clone();
        let handle = tokio::spawn(run_ticks("test", ticker, rx, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    panic!("first tick fails");
                }
            }
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop on shutdown")
            .unwrap();

        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
