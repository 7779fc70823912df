//! Debounced fallback timer
//!
//! One armed timer at a time. Scheduling again aborts the previous timer
//! task (last keystroke wins). The fire callback runs synchronously inside
//! the timer task; anything long-running it starts must be spawned
//! separately so that aborting a later timer never aborts it.

use crate::machine::QueryGeneration;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct ArmedTimer {
    generation: QueryGeneration,
    handle: JoinHandle<()>,
}

/// Single-slot debounce timer
#[derive(Debug)]
pub struct DebouncedFallback {
    window: Duration,
    runtime: Handle,
    armed: Option<ArmedTimer>,
    scheduled: u64,
}

impl DebouncedFallback {
    /// Create timer with quiet period `window`
    #[must_use]
    pub fn new(window: Duration, runtime: Handle) -> Self {
        Self {
            window,
            runtime,
            armed: None,
            scheduled: 0,
        }
    }

    /// Quiet period
    #[inline]
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm for `generation`, replacing any armed timer
    pub fn schedule<F>(&mut self, generation: QueryGeneration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.scheduled += 1;
        let window = self.window;
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            on_fire();
        });
        tracing::trace!("armed fallback timer for {} ({}ms)", generation, window.as_millis());
        self.armed = Some(ArmedTimer { generation, handle });
    }

    /// Abort the armed timer, if any; returns whether one was armed
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(timer) if !timer.handle.is_finished() => {
                timer.handle.abort();
                tracing::trace!("cancelled fallback timer for {}", timer.generation);
                true
            }
            _ => false,
        }
    }

    /// Forget the timer for `generation` after it fired
    pub fn fired(&mut self, generation: QueryGeneration) {
        if self
            .armed
            .as_ref()
            .is_some_and(|timer| timer.generation == generation)
        {
            self.armed = None;
        }
    }

    /// Whether a timer is armed and has not fired
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|timer| !timer.handle.is_finished())
    }

    /// Generation of the armed timer
    #[must_use]
    pub fn armed_generation(&self) -> Option<QueryGeneration> {
        self.armed.as_ref().map(|timer| timer.generation)
    }

    /// Timers scheduled since creation
    #[inline]
    #[must_use]
    pub fn scheduled(&self) -> u64 {
        self.scheduled
    }
}

impl Drop for DebouncedFallback {
    fn drop(&mut self) {
        self.cancel();
    }
}
