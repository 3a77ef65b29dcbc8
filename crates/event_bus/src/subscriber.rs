use std::{
    any::Any,
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use shared::domain::{OwnerId, SubscriptionId};

use crate::ui::UiHandle;

pub(crate) type Payload = Arc<dyn Any + Send + Sync>;
pub(crate) type Callback = Box<dyn Fn(Payload) + Send + Sync>;

pub(crate) enum Delivery {
    /// Run on the posting thread, serialized per subscription.
    Direct,
    /// Queued onto the owner's UI loop.
    Ui(UiHandle),
}

#[derive(Default)]
struct Mailbox {
    pending: VecDeque<Payload>,
    draining: bool,
}

pub(crate) struct Subscriber {
    id: SubscriptionId,
    owner: OwnerId,
    active: AtomicBool,
    delivery: Delivery,
    callback: Callback,
    mailbox: Mutex<Mailbox>,
}

impl Subscriber {
    pub(crate) fn new(owner: OwnerId, delivery: Delivery, callback: Callback) -> Self {
        Self {
            id: SubscriptionId::next(),
            owner,
            active: AtomicBool::new(true),
            delivery,
            callback,
            mailbox: Mutex::new(Mailbox::default()),
        }
    }

    pub(crate) fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn owner(&self) -> OwnerId {
        self.owner
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Must be called with the bus lock held so that enqueue order matches post order.
    pub(crate) fn enqueue(self: &Arc<Self>, payload: Payload) {
        match &self.delivery {
            Delivery::Ui(ui) => {
                let this = Arc::clone(self);
                if !ui.dispatch(move || this.invoke(payload)) {
                    tracing::debug!(subscription = %self.id, "ui loop gone; delivery skipped");
                }
            }
            Delivery::Direct => self.lock_mailbox().pending.push_back(payload),
        }
    }

    /// Runs queued direct deliveries outside the bus lock. A thread that finds
    /// another drain in progress leaves its payload to that drain.
    pub(crate) fn drain(&self) {
        if !matches!(self.delivery, Delivery::Direct) {
            return;
        }
        {
            let mut mailbox = self.lock_mailbox();
            if mailbox.draining {
                return;
            }
            mailbox.draining = true;
        }
        let _reset = DrainReset(self);
        loop {
            let next = {
                let mut mailbox = self.lock_mailbox();
                match mailbox.pending.pop_front() {
                    Some(payload) => payload,
                    None => {
                        mailbox.draining = false;
                        return;
                    }
                }
            };
            self.invoke(next);
        }
    }

    fn invoke(&self, payload: Payload) {
        if self.is_active() {
            (self.callback)(payload);
        }
    }

    fn lock_mailbox(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the draining flag if a callback unwinds mid-drain.
struct DrainReset<'a>(&'a Subscriber);

impl Drop for DrainReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock_mailbox().draining = false;
        }
    }
}
