use shared::domain::OwnerId;

use crate::ui::UiHandle;

/// Identity of a display-tier component that holds subscriptions.
///
/// Every owner gets a fresh [`OwnerId`]; a recreated component is a new owner.
#[derive(Debug, Clone)]
pub struct Owner {
    id: OwnerId,
    ui: UiHandle,
}

impl Owner {
    pub fn new(ui: UiHandle) -> Self {
        Self {
            id: OwnerId::next(),
            ui,
        }
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    pub fn ui(&self) -> &UiHandle {
        &self.ui
    }
}
