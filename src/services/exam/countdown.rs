// src/services/exam/countdown.rs

use std::{future::Future, ops::ControlFlow, time::Duration};

use tokio::{task::JoinHandle, time::Instant};

/// A periodic task owned by whoever holds the handle.
///
/// Dropping the handle aborts the task, so a countdown can never outlive the
/// session that started it.
#[derive(Debug)]
pub struct Countdown {
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    /// Calls `on_tick` every `period` (first call one period from now) until it breaks.
    ///
    /// Paced by tokio's monotonic clock; wall-clock jumps do not shorten the exam.
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if on_tick().await.is_break() {
                    break;
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Lets the task run to completion on its own.
    /// Used by the task itself when it finishes the session it belongs to.
    pub fn detach(mut self) {
        self.handle.take();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
