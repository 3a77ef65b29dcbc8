//! Cancellable grouping of the operations a view model launches.
//!
//! Every operation runs on the runtime's worker pool. When it settles, its
//! callbacks are run only if the scope is still live; [`TaskScope::cancel`]
//! waits for callbacks already running on other threads, so none start after
//! it returns.

use std::{
    cell::RefCell,
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
    },
};

use shared::domain::{ScopeId, TaskId};
use tokio::{runtime::Handle, task::AbortHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Running,
            1 => Self::Succeeded,
            2 => Self::Failed,
            _ => Self::Cancelled,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Succeeded => 1,
            Self::Failed => 2,
            Self::Cancelled => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Self::Running
    }
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

pub struct Settlement {
    state: TaskState,
    callbacks: Vec<Callback>,
}

impl Settlement {
    pub fn succeeded() -> Self {
        Self {
            state: TaskState::Succeeded,
            callbacks: Vec::new(),
        }
    }

    pub fn failed() -> Self {
        Self {
            state: TaskState::Failed,
            callbacks: Vec::new(),
        }
    }

    pub fn then(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    pub fn state(&self) -> TaskState {
        self.state
    }
}

#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: TaskId,
    state: AtomicU8,
    abort: Mutex<Option<AbortHandle>>,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl TaskHandle {
    fn new(state: TaskState) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: TaskId::next(),
                state: AtomicU8::new(state.as_u8()),
                abort: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    fn transition(&self, to: TaskState) -> bool {
        self.inner
            .state
            .compare_exchange(
                TaskState::Running.as_u8(),
                to.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    fn set_abort(&self, abort: AbortHandle) {
        *lock(&self.inner.abort) = Some(abort);
    }

    fn abort(&self) {
        if let Some(abort) = lock(&self.inner.abort).take() {
            abort.abort();
        }
    }
}

thread_local! {
    static DISPATCHING: RefCell<Vec<ScopeId>> = const { RefCell::new(Vec::new()) };
}

/// Marks the current thread as running callbacks for a scope.
struct DispatchMark(ScopeId);

impl DispatchMark {
    fn enter(scope: ScopeId) -> Self {
        DISPATCHING.with(|stack| stack.borrow_mut().push(scope));
        Self(scope)
    }

    fn is_active(scope: ScopeId) -> bool {
        DISPATCHING.with(|stack| stack.borrow().contains(&scope))
    }
}

impl Drop for DispatchMark {
    fn drop(&mut self) {
        DISPATCHING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|scope| *scope == self.0) {
                stack.remove(pos);
            }
        });
    }
}

#[derive(Clone)]
pub struct TaskScope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: ScopeId,
    runtime: Handle,
    token: CancellationToken,
    gate: RwLock<()>,
    active: Mutex<HashMap<TaskId, TaskHandle>>,
}

impl std::fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScope")
            .field("id", &self.inner.id)
            .field("cancelled", &self.is_cancelled())
            .field("active", &self.active_count())
            .finish()
    }
}

impl TaskScope {
    pub fn new(runtime: Handle) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: ScopeId::next(),
                runtime,
                token: CancellationToken::new(),
                gate: RwLock::new(()),
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub fn active_count(&self) -> usize {
        lock(&self.inner.active).len()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.token.child_token()
    }

    /// Runs `operation` on the worker pool and settles its handle with the
    /// [`Settlement`] it yields. After cancellation this returns a handle that
    /// is already [`TaskState::Cancelled`] and nothing is spawned.
    pub fn spawn<F>(&self, operation: F) -> TaskHandle
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        let mut active = lock(&self.inner.active);
        if self.inner.token.is_cancelled() {
            debug!(scope = %self.inner.id, "launch rejected; scope already cancelled");
            return TaskHandle::new(TaskState::Cancelled);
        }

        let handle = TaskHandle::new(TaskState::Running);
        active.insert(handle.id(), handle.clone());

        let scope = Arc::clone(&self.inner);
        let task_handle = handle.clone();
        let join = self.inner.runtime.spawn(async move {
            let token = scope.token.clone();
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    task_handle.transition(TaskState::Cancelled);
                    trace!(scope = %scope.id, task = %task_handle.id(), "operation abandoned");
                }
                settlement = operation => scope.settle(&task_handle, settlement),
            }
            lock(&scope.active).remove(&task_handle.id());
        });
        handle.set_abort(join.abort_handle());
        handle
    }

    /// Cancels the scope. Running handles become [`TaskState::Cancelled`] and
    /// no callback of this scope starts once this returns.
    pub fn cancel(&self) {
        self.inner.token.cancel();
        if !DispatchMark::is_active(self.inner.id) {
            drop(
                self.inner
                    .gate
                    .write()
                    .unwrap_or_else(PoisonError::into_inner),
            );
        }

        let handles: Vec<TaskHandle> = lock(&self.inner.active)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        let mut cancelled = 0;
        for handle in handles {
            if handle.transition(TaskState::Cancelled) {
                cancelled += 1;
            }
            handle.abort();
        }
        debug!(scope = %self.inner.id, cancelled, "task scope cancelled");
    }
}

impl ScopeInner {
    fn settle(&self, handle: &TaskHandle, settlement: Settlement) {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            handle.transition(TaskState::Cancelled);
            debug!(scope = %self.id, task = %handle.id(), "outcome discarded after cancellation");
            return;
        }
        if !handle.transition(settlement.state) {
            return;
        }

        let _mark = DispatchMark::enter(self.id);
        for callback in settlement.callbacks {
            if self.token.is_cancelled() {
                debug!(scope = %self.id, task = %handle.id(), "remaining callbacks suppressed");
                break;
            }
            callback();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/scope_tests.rs"]
mod tests;
