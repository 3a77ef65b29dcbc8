//! Display-tier side of a view model: subscribe on attach, unsubscribe on teardown.

use std::sync::Arc;

use event_bus::{BusError, EventBus, Owner};
use shared::domain::{FinishRequest, OwnerId, ScreenRequest, ScreenResult};
use tracing::debug;

use crate::{
    channels::LoadState,
    view_model::{Model, ViewModel},
};

/// What a screen does when its view model asks for a UI change. Every method
/// runs on the owner's UI thread.
pub trait ScreenHost: Send + Sync + 'static {
    fn start_screen(&self, request: ScreenRequest);

    fn start_screen_for_result(&self, request: ScreenRequest) {
        self.start_screen(request);
    }

    fn finish(&self, request: FinishRequest);

    fn set_result(&self, _result: ScreenResult) {}

    fn show_loading(&self, _message: Option<String>) {}

    fn dismiss_loading(&self) {}

    fn show_load_state(&self, _state: LoadState) {}
}

/// Which channel groups a screen opts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenOptions {
    pub navigation: bool,
    pub for_result: bool,
    pub loading: bool,
    pub load_state: bool,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            navigation: true,
            for_result: false,
            loading: true,
            load_state: false,
        }
    }
}

impl ScreenOptions {
    pub fn all() -> Self {
        Self {
            navigation: true,
            for_result: true,
            loading: true,
            load_state: true,
        }
    }
}

/// Live subscriptions of one screen. Dropping it unsubscribes everything.
#[derive(Debug)]
pub struct ScreenBinding {
    bus: EventBus,
    owner: OwnerId,
    subscriptions: usize,
    detached: bool,
}

impl ScreenBinding {
    pub fn attach<M, H>(
        owner: &Owner,
        view_model: &ViewModel<M>,
        host: Arc<H>,
        options: ScreenOptions,
    ) -> Result<Self, BusError>
    where
        M: Model,
        H: ScreenHost,
    {
        let bus = view_model.bus().clone();
        // Constructed first so a failed subscribe still unsubscribes on drop.
        let mut binding = Self {
            bus: bus.clone(),
            owner: owner.id(),
            subscriptions: 0,
            detached: false,
        };

        if options.navigation {
            let channels = view_model.enable_navigation();
            let h = Arc::clone(&host);
            bus.subscribe(owner, &channels.start, move |req| h.start_screen(req), true)?;
            let h = Arc::clone(&host);
            bus.subscribe(owner, &channels.finish, move |req| h.finish(req), true)?;
            let h = Arc::clone(&host);
            bus.subscribe(owner, &channels.set_result, move |res| h.set_result(res), true)?;
            binding.subscriptions += 3;
        }
        if options.for_result {
            let channels = view_model.enable_for_result();
            let h = Arc::clone(&host);
            bus.subscribe(
                owner,
                &channels.start,
                move |req| h.start_screen_for_result(req),
                true,
            )?;
            binding.subscriptions += 1;
        }
        if options.loading {
            let channels = view_model.enable_loading();
            let h = Arc::clone(&host);
            bus.subscribe(owner, &channels.show, move |msg| h.show_loading(msg), true)?;
            let h = Arc::clone(&host);
            bus.subscribe(owner, &channels.dismiss, move |()| h.dismiss_loading(), true)?;
            binding.subscriptions += 2;
        }
        if options.load_state {
            let channels = view_model.enable_load_state();
            let h = Arc::clone(&host);
            bus.subscribe(owner, &channels.state, move |state| h.show_load_state(state), true)?;
            binding.subscriptions += 1;
        }

        debug!(owner = %binding.owner, subscriptions = binding.subscriptions, "screen attached");
        Ok(binding)
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions
    }

    /// Removes every subscription of this screen's owner. Safe to call twice.
    pub fn detach(&mut self) -> usize {
        if std::mem::replace(&mut self.detached, true) {
            return 0;
        }
        let removed = self.bus.unsubscribe_all(self.owner);
        debug!(owner = %self.owner, removed, "screen detached");
        removed
    }
}

impl Drop for ScreenBinding {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;
