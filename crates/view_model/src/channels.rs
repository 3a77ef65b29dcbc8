//! Channel groups a view model posts UI changes on.
//!
//! Groups are declared on demand, when a display-tier component opts in while
//! attaching, and live for as long as the view model does.

use event_bus::{Channel, ChannelKey, EventBus};
use serde::{Deserialize, Serialize};
use shared::domain::{FinishRequest, ScreenRequest, ScreenResult};

/// What an embedded status area should show in place of regular content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadState {
    Success,
    Loading,
    Empty,
    Error(String),
    Timeout,
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct NavigationChannels {
    pub start: Channel<ScreenRequest>,
    pub finish: Channel<FinishRequest>,
    pub set_result: Channel<ScreenResult>,
}

#[derive(Debug, Clone)]
pub struct ForResultChannels {
    pub start: Channel<ScreenRequest>,
}

#[derive(Debug, Clone)]
pub struct LoadingChannels {
    pub show: Channel<Option<String>>,
    pub dismiss: Channel<()>,
}

#[derive(Debug, Clone)]
pub struct LoadStateChannels {
    pub state: Channel<LoadState>,
}

/// List notifications for pull-to-refresh and incremental loading.
#[derive(Debug, Clone)]
pub struct ListChannels {
    pub refresh: Channel<()>,
    pub load_more: Channel<()>,
    pub load_more_complete: Channel<()>,
    pub load_more_fail: Channel<()>,
    pub load_more_end: Channel<()>,
}

impl NavigationChannels {
    pub(crate) fn declare(bus: &EventBus) -> Self {
        Self {
            start: bus.declare(false),
            finish: bus.declare(false),
            set_result: bus.declare(false),
        }
    }

    fn keys(&self) -> Vec<ChannelKey> {
        vec![
            self.start.key().clone(),
            self.finish.key().clone(),
            self.set_result.key().clone(),
        ]
    }
}

impl ForResultChannels {
    pub(crate) fn declare(bus: &EventBus) -> Self {
        Self {
            start: bus.declare(false),
        }
    }

    fn keys(&self) -> Vec<ChannelKey> {
        vec![self.start.key().clone()]
    }
}

impl LoadingChannels {
    pub(crate) fn declare(bus: &EventBus) -> Self {
        Self {
            show: bus.declare(false),
            dismiss: bus.declare(false),
        }
    }

    fn keys(&self) -> Vec<ChannelKey> {
        vec![self.show.key().clone(), self.dismiss.key().clone()]
    }
}

impl LoadStateChannels {
    pub(crate) fn declare(bus: &EventBus) -> Self {
        Self {
            state: bus.declare(true),
        }
    }

    fn keys(&self) -> Vec<ChannelKey> {
        vec![self.state.key().clone()]
    }
}

impl ListChannels {
    pub(crate) fn declare(bus: &EventBus) -> Self {
        Self {
            refresh: bus.declare(false),
            load_more: bus.declare(false),
            load_more_complete: bus.declare(false),
            load_more_fail: bus.declare(false),
            load_more_end: bus.declare(false),
        }
    }

    pub(crate) fn keys(&self) -> Vec<ChannelKey> {
        vec![
            self.refresh.key().clone(),
            self.load_more.key().clone(),
            self.load_more_complete.key().clone(),
            self.load_more_fail.key().clone(),
            self.load_more_end.key().clone(),
        ]
    }
}

#[derive(Debug, Default)]
pub(crate) struct UiChangeChannels {
    pub(crate) navigation: Option<NavigationChannels>,
    pub(crate) for_result: Option<ForResultChannels>,
    pub(crate) loading: Option<LoadingChannels>,
    pub(crate) load_state: Option<LoadStateChannels>,
}

impl UiChangeChannels {
    pub(crate) fn keys(&self) -> Vec<ChannelKey> {
        let mut keys = Vec::new();
        if let Some(group) = &self.navigation {
            keys.extend(group.keys());
        }
        if let Some(group) = &self.for_result {
            keys.extend(group.keys());
        }
        if let Some(group) = &self.loading {
            keys.extend(group.keys());
        }
        if let Some(group) = &self.load_state {
            keys.extend(group.keys());
        }
        keys
    }
}
