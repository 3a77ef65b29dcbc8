//! Main-thread marshalling for display-tier callbacks.
//!
//! A [`UiLoop`] is created on the thread that renders the display tier and
//! stays there. Any thread may queue work onto it through a [`UiHandle`]; the
//! queued closures run, in FIFO order, whenever the loop is pumped.

use std::{
    marker::PhantomData,
    rc::Rc,
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

type UiTask = Box<dyn FnOnce() + Send>;

pub struct UiLoop {
    tx: Sender<UiTask>,
    rx: Receiver<UiTask>,
    thread: ThreadId,
    _not_send: PhantomData<Rc<()>>,
}

#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<UiTask>,
    thread: ThreadId,
}

impl std::fmt::Debug for UiHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiHandle")
            .field("thread", &self.thread)
            .field("queued", &self.tx.len())
            .finish()
    }
}

impl Default for UiLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl UiLoop {
    /// Binds a new loop to the calling thread.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            thread: thread::current().id(),
            _not_send: PhantomData,
        }
    }

    pub fn handle(&self) -> UiHandle {
        UiHandle {
            tx: self.tx.clone(),
            thread: self.thread,
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Runs everything queued so far without blocking. Returns how many closures ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Waits up to `timeout` for work to arrive, then drains the queue.
    pub fn run_for(&self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Pumps the loop until `done` holds or `timeout` elapses. Returns whether `done` held.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.run_for((deadline - now).min(Duration::from_millis(10)));
        }
    }
}

impl UiHandle {
    /// Queues `task` for the UI thread. Returns false once the loop is gone.
    pub fn dispatch(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(task)).is_ok()
    }

    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread
    }
}

#[cfg(test)]
#[path = "tests/ui_tests.rs"]
mod tests;
