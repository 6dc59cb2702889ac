//! Single-threaded event loop driving self-rescheduling tasks.
//!
//! The loop sleeps until the earliest pending event is due, pops it and
//! awaits its handler to completion before looking at the queue again.
//! Handlers only see the queue through `Schedule`, so the one thing they
//! can do is add events (typically their own next occurrence).

mod queue;

pub use queue::*;

use tokio::time::Instant;

/// Executes tasks popped from the event queue.
#[allow(async_fn_in_trait)]
pub trait Dispatch<T> {
    type Error;

    /// Run `task`, which was due at `fired_at`.
    async fn dispatch(
        &mut self,
        task: T,
        fired_at: Instant,
        scheduler: &mut dyn Schedule<T>,
    ) -> Result<(), Self::Error>;
}

/// The event loop driver.
#[derive(Debug)]
pub struct EventLoop<T> {
    queue: EventQueue<T>,
}

impl<T> EventLoop<T> {
    pub fn new() -> Self {
        Self {
            queue: EventQueue::new(),
        }
    }

    /// Scheduling handle for seeding the initial events.
    pub fn scheduler(&mut self) -> &mut dyn Schedule<T> {
        &mut self.queue
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Run until the queue drains. With periodic tasks that never happens.
    pub async fn run<D: Dispatch<T>>(&mut self, handler: &mut D) -> Result<(), D::Error> {
        self.drive(handler, None).await
    }

    /// Run every event due at or before `deadline`, then return.
    pub async fn run_until<D: Dispatch<T>>(
        &mut self,
        handler: &mut D,
        deadline: Instant,
    ) -> Result<(), D::Error> {
        self.drive(handler, Some(deadline)).await
    }

    async fn drive<D: Dispatch<T>>(
        &mut self,
        handler: &mut D,
        deadline: Option<Instant>,
    ) -> Result<(), D::Error> {
        while let Some(at) = self.queue.peek_at() {
            if deadline.is_some_and(|d| at > d) {
                break;
            }

            tokio::time::sleep_until(at).await;

            let Some(event) = self.queue.pop() else {
                break;
            };
            handler.dispatch(event.task, event.at, &mut self.queue).await?;
        }
        Ok(())
    }
}

impl<T> Default for EventLoop<T> {
    fn default() -> Self {
        Self::new()
    }
}
