//! Keyed publish/subscribe between view models and the display tier.
//!
//! View models [`declare`](EventBus::declare) channels and post onto them;
//! display-tier components subscribe under an [`Owner`] and must call
//! [`unsubscribe_all`](EventBus::unsubscribe_all) when they are torn down.
//!
//! Sticky channels keep their latest value and replay it to each new
//! subscriber. Non-sticky channels model one-shot commands: a post reaches the
//! subscribers present at that moment and is otherwise dropped.

use std::{
    any::Any,
    collections::{HashMap, HashSet},
    fmt,
    marker::PhantomData,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::domain::{OwnerId, SubscriptionId};
use thiserror::Error;
use tracing::{debug, trace, warn};
use uuid::Uuid;

mod owner;
mod subscriber;
pub mod ui;

pub use owner::Owner;
pub use ui::{UiHandle, UiLoop};

use subscriber::{Callback, Delivery, Payload, Subscriber};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey(Arc<str>);

impl ChannelKey {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct Channel<T> {
    key: ChannelKey,
    sticky: bool,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            sticky: self.sticky,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("key", &self.key)
            .field("sticky", &self.sticky)
            .finish()
    }
}

impl<T> Channel<T> {
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("channel {0} was never declared or has already been retired")]
    Undeclared(ChannelKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    Delivered(usize),
    Retained,
    Dropped,
}

struct ChannelState {
    sticky: bool,
    last: Option<Payload>,
    subscribers: Vec<Arc<Subscriber>>,
}

#[derive(Default)]
struct BusState {
    channels: HashMap<ChannelKey, ChannelState>,
    owners: HashMap<OwnerId, HashSet<ChannelKey>>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    state: Arc<Mutex<BusState>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("EventBus")
            .field("channels", &state.channels.len())
            .field("owners", &state.owners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh channel. Keys are never reused, so two view models of
    /// the same type never share a channel.
    pub fn declare<T>(&self, sticky: bool) -> Channel<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = ChannelKey::generate();
        self.lock().channels.insert(
            key.clone(),
            ChannelState {
                sticky,
                last: None,
                subscribers: Vec::new(),
            },
        );
        trace!(channel = %key, sticky, "declared channel");
        Channel {
            key,
            sticky,
            _marker: PhantomData,
        }
    }

    pub fn is_declared(&self, key: &ChannelKey) -> bool {
        self.lock().channels.contains_key(key)
    }

    pub fn subscriber_count(&self, key: &ChannelKey) -> usize {
        self.lock()
            .channels
            .get(key)
            .map_or(0, |channel| channel.subscribers.len())
    }

    /// Registers `callback` for `owner` on `channel`, replacing any earlier
    /// subscription of the same owner on that channel. A sticky channel that
    /// already holds a value replays it before any later post reaches the
    /// callback.
    pub fn subscribe<T, F>(
        &self,
        owner: &Owner,
        channel: &Channel<T>,
        callback: F,
        deliver_on_ui_thread: bool,
    ) -> Result<SubscriptionId, BusError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let delivery = if deliver_on_ui_thread {
            Delivery::Ui(owner.ui().clone())
        } else {
            Delivery::Direct
        };
        let subscriber = Arc::new(Subscriber::new(
            owner.id(),
            delivery,
            erase::<T, F>(channel.key.clone(), callback),
        ));

        let replaced = {
            let mut guard = self.lock();
            let BusState { channels, owners } = &mut *guard;
            let state = channels
                .get_mut(&channel.key)
                .ok_or_else(|| BusError::Undeclared(channel.key.clone()))?;
            let replaced = state
                .subscribers
                .iter()
                .position(|existing| existing.owner() == owner.id())
                .map(|index| state.subscribers.remove(index));
            state.subscribers.push(Arc::clone(&subscriber));
            owners
                .entry(owner.id())
                .or_default()
                .insert(channel.key.clone());
            if let Some(last) = &state.last {
                subscriber.enqueue(Arc::clone(last));
            }
            replaced
        };

        if let Some(previous) = replaced {
            previous.deactivate();
            debug!(channel = %channel.key, owner = %owner.id(), "replaced existing subscription");
        }
        subscriber.drain();
        Ok(subscriber.id())
    }

    /// Posts `value`, panicking if the channel is unknown.
    ///
    /// # Panics
    ///
    /// Posting to a channel that was never declared, or was retired with its
    /// view model, is a programming error.
    pub fn post<T>(&self, channel: &Channel<T>, value: T) -> PostOutcome
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.try_post(channel, value) {
            Ok(outcome) => outcome,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_post<T>(&self, channel: &Channel<T>, value: T) -> Result<PostOutcome, BusError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let payload: Payload = Arc::new(value);
        let (targets, sticky) = {
            let mut guard = self.lock();
            let state = guard
                .channels
                .get_mut(&channel.key)
                .ok_or_else(|| BusError::Undeclared(channel.key.clone()))?;
            if state.sticky {
                state.last = Some(Arc::clone(&payload));
            }
            for subscriber in &state.subscribers {
                subscriber.enqueue(Arc::clone(&payload));
            }
            (state.subscribers.clone(), state.sticky)
        };

        for subscriber in &targets {
            subscriber.drain();
        }

        Ok(match (targets.len(), sticky) {
            (0, true) => PostOutcome::Retained,
            (0, false) => {
                trace!(channel = %channel.key, "no subscribers; one-shot value dropped");
                PostOutcome::Dropped
            }
            (count, _) => PostOutcome::Delivered(count),
        })
    }

    pub fn unsubscribe_all(&self, owner: OwnerId) -> usize {
        let removed = {
            let mut guard = self.lock();
            let BusState { channels, owners } = &mut *guard;
            let Some(keys) = owners.remove(&owner) else {
                return 0;
            };
            let mut removed = Vec::new();
            for key in keys {
                if let Some(state) = channels.get_mut(&key) {
                    state.subscribers.retain(|subscriber| {
                        if subscriber.owner() == owner {
                            removed.push(Arc::clone(subscriber));
                            false
                        } else {
                            true
                        }
                    });
                }
            }
            removed
        };

        for subscriber in &removed {
            subscriber.deactivate();
        }
        debug!(%owner, count = removed.len(), "unsubscribed owner");
        removed.len()
    }

    /// Later posts or subscriptions on a retired channel fail as undeclared.
    pub fn retire(&self, key: &ChannelKey) -> bool {
        let state = {
            let mut guard = self.lock();
            let BusState { channels, owners } = &mut *guard;
            let Some(state) = channels.remove(key) else {
                return false;
            };
            for subscriber in &state.subscribers {
                if let Some(keys) = owners.get_mut(&subscriber.owner()) {
                    keys.remove(key);
                    if keys.is_empty() {
                        owners.remove(&subscriber.owner());
                    }
                }
            }
            state
        };

        for subscriber in &state.subscribers {
            subscriber.deactivate();
        }
        trace!(channel = %key, "retired channel");
        true
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn erase<T, F>(key: ChannelKey, callback: F) -> Callback
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    Box::new(move |payload: Payload| {
        let payload: &(dyn Any + Send + Sync) = &*payload;
        match payload.downcast_ref::<T>() {
            Some(value) => callback(value.clone()),
            None => warn!(channel = %key, "payload type mismatch; delivery skipped"),
        }
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
