use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use event_bus::{Channel, EventBus, PostOutcome};
use shared::{
    domain::{FinishRequest, Route, ScreenArgs, ScreenRequest, ScreenResult, RESULT_CANCELED, RESULT_OK},
    envelope::{ApiResponse, Page, PageResponse},
    error::Failure,
    paging::PageCursor,
};
use tokio::runtime::Handle;
use tracing::debug;

use crate::{
    adapter::OnSuccess,
    channels::{
        ForResultChannels, ListChannels, LoadState, LoadStateChannels, LoadingChannels,
        NavigationChannels, UiChangeChannels,
    },
    scope::{TaskHandle, TaskScope},
};

pub const DEFAULT_LOADING_MESSAGE: &str = "Please wait...";

/// Data layer a view model drives. Supplied to the view model at construction.
pub trait Model: Send + Sync + 'static {
    fn on_cleared(&self) {}

    fn on_result_ok(&self, _data: Option<&ScreenArgs>) {}

    fn on_result_canceled(&self, _data: Option<&ScreenArgs>) {}

    fn on_result(&self, _code: i32, _data: Option<&ScreenArgs>) {}
}

impl Model for () {}

/// Presentation-logic unit: owns one [`TaskScope`], the channels it posts UI
/// changes on, and a page cursor for paginated listings.
///
/// Dropping the view model clears it.
pub struct ViewModel<M: Model = ()> {
    bus: EventBus,
    scope: TaskScope,
    model: Arc<M>,
    ui: Mutex<UiChangeChannels>,
    list: ListChannels,
    cursor: Mutex<PageCursor>,
    cleared: AtomicBool,
}

impl<M: Model> ViewModel<M> {
    pub fn new(bus: EventBus, runtime: Handle, model: M) -> Self {
        let list = ListChannels::declare(&bus);
        Self {
            scope: TaskScope::new(runtime),
            bus,
            model: Arc::new(model),
            ui: Mutex::new(UiChangeChannels::default()),
            list,
            cursor: Mutex::new(PageCursor::new()),
            cleared: AtomicBool::new(false),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn scope(&self) -> &TaskScope {
        &self.scope
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }

    // Channel groups. Each is declared once and reused for the view model's lifetime.

    pub fn enable_navigation(&self) -> NavigationChannels {
        let mut ui = self.ui();
        ui.navigation
            .get_or_insert_with(|| NavigationChannels::declare(&self.bus))
            .clone()
    }

    pub fn enable_for_result(&self) -> ForResultChannels {
        let mut ui = self.ui();
        ui.for_result
            .get_or_insert_with(|| ForResultChannels::declare(&self.bus))
            .clone()
    }

    pub fn enable_loading(&self) -> LoadingChannels {
        let mut ui = self.ui();
        ui.loading
            .get_or_insert_with(|| LoadingChannels::declare(&self.bus))
            .clone()
    }

    pub fn enable_load_state(&self) -> LoadStateChannels {
        let mut ui = self.ui();
        ui.load_state
            .get_or_insert_with(|| LoadStateChannels::declare(&self.bus))
            .clone()
    }

    pub fn list_channels(&self) -> &ListChannels {
        &self.list
    }

    // Navigation. These panic when no screen enabled the matching group.

    pub fn start_screen(&self, route: Route) -> PostOutcome {
        let channels = self.navigation();
        self.bus.post(&channels.start, ScreenRequest::new(route))
    }

    pub fn start_screen_with_args(&self, route: Route, args: ScreenArgs) -> PostOutcome {
        let channels = self.navigation();
        self.bus
            .post(&channels.start, ScreenRequest::with_args(route, args))
    }

    pub fn start_screen_for_result(&self, route: Route, args: Option<ScreenArgs>) -> PostOutcome {
        let channels = self
            .ui()
            .for_result
            .clone()
            .unwrap_or_else(|| not_enabled("start-for-result"));
        self.bus
            .post(&channels.start, ScreenRequest { route, args })
    }

    pub fn finish(&self, result_code: Option<i32>, data: Option<ScreenArgs>) -> PostOutcome {
        let channels = self.navigation();
        self.bus
            .post(&channels.finish, FinishRequest { result_code, data })
    }

    pub fn set_result(&self, code: i32, data: Option<ScreenArgs>) -> PostOutcome {
        let channels = self.navigation();
        self.bus
            .post(&channels.set_result, ScreenResult { code, data })
    }

    // Loading overlay and embedded load state.

    pub fn show_loading(&self, message: Option<String>) -> PostOutcome {
        let channels = self.loading();
        self.bus.post(&channels.show, message)
    }

    pub fn show_default_loading(&self) -> PostOutcome {
        self.show_loading(Some(DEFAULT_LOADING_MESSAGE.to_string()))
    }

    pub fn dismiss_loading(&self) -> PostOutcome {
        let channels = self.loading();
        self.bus.post(&channels.dismiss, ())
    }

    pub fn show_load_state(&self, state: LoadState) -> PostOutcome {
        let channels = self
            .ui()
            .load_state
            .clone()
            .unwrap_or_else(|| not_enabled("load-state"));
        self.bus.post(&channels.state, state)
    }

    pub fn show_load_success(&self) -> PostOutcome {
        self.show_load_state(LoadState::Success)
    }

    // List notifications.

    pub fn refresh(&self) -> PostOutcome {
        self.post_list(&self.list.refresh)
    }

    pub fn load_more(&self) -> PostOutcome {
        self.post_list(&self.list.load_more)
    }

    pub fn load_more_complete(&self) -> PostOutcome {
        self.post_list(&self.list.load_more_complete)
    }

    pub fn load_more_fail(&self) -> PostOutcome {
        self.post_list(&self.list.load_more_fail)
    }

    pub fn load_more_end(&self) -> PostOutcome {
        self.post_list(&self.list.load_more_end)
    }

    // Paging.

    pub fn page_index(&self) -> i32 {
        lock(&self.cursor).index()
    }

    /// Advances the page cursor given the listing's page count.
    pub fn next_page(&self, pages: i32) -> i32 {
        lock(&self.cursor).advance(pages)
    }

    pub fn reset_page(&self) {
        lock(&self.cursor).reset();
    }

    // Launching.

    pub fn launch<Fut, R, T>(
        &self,
        operation: Fut,
        on_success: Option<OnSuccess>,
        on_result: impl FnOnce(Option<T>) + Send + 'static,
        on_failure: impl FnOnce(Failure) + Send + 'static,
    ) -> TaskHandle
    where
        Fut: Future<Output = anyhow::Result<Option<R>>> + Send + 'static,
        R: ApiResponse<Data = T> + Send + 'static,
        T: Send + 'static,
    {
        self.scope
            .launch(operation, on_success, on_result, on_failure)
    }

    pub fn page_launch<Fut, R, T>(
        &self,
        operation: Fut,
        on_success: Option<OnSuccess>,
        on_failure: impl FnOnce(Failure) + Send + 'static,
        on_result: impl FnOnce(Page<T>) + Send + 'static,
    ) -> TaskHandle
    where
        Fut: Future<Output = anyhow::Result<Option<R>>> + Send + 'static,
        R: PageResponse<Item = T> + Send + 'static,
        T: Send + 'static,
    {
        self.scope
            .page_launch(operation, on_success, on_failure, on_result)
    }

    pub fn launch_ui<Fut>(&self, operation: Fut) -> TaskHandle
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.scope.launch_ui(operation)
    }

    /// Routes a child screen's outcome to the model hooks.
    pub fn deliver_screen_result(&self, result: ScreenResult) {
        let data = result.data.as_ref();
        match result.code {
            RESULT_OK => self.model.on_result_ok(data),
            RESULT_CANCELED => self.model.on_result_canceled(data),
            code => self.model.on_result(code, data),
        }
    }

    /// Tears the view model down. Launched operations are cancelled before the
    /// model is cleared, so none of their callbacks sees a cleared model.
    /// Idempotent.
    pub fn clear(&self) {
        if self.cleared.swap(true, Ordering::SeqCst) {
            return;
        }
        self.scope.cancel();
        self.model.on_cleared();

        let mut keys = self.ui().keys();
        keys.extend(self.list.keys());
        let retired = keys.iter().filter(|key| self.bus.retire(key)).count();
        debug!(scope = %self.scope.id(), retired, "view model cleared");
    }

    fn ui(&self) -> MutexGuard<'_, UiChangeChannels> {
        lock(&self.ui)
    }

    fn navigation(&self) -> NavigationChannels {
        self.ui()
            .navigation
            .clone()
            .unwrap_or_else(|| not_enabled("navigation"))
    }

    fn loading(&self) -> LoadingChannels {
        self.ui()
            .loading
            .clone()
            .unwrap_or_else(|| not_enabled("loading"))
    }

    fn post_list(&self, channel: &Channel<()>) -> PostOutcome {
        self.bus.post(channel, ())
    }
}

impl<M: Model> Drop for ViewModel<M> {
    fn drop(&mut self) {
        self.clear();
    }
}

fn not_enabled<T>(group: &str) -> T {
    panic!("{group} channels are not enabled; a screen must opt into them before the view model posts")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/view_model_tests.rs"]
mod tests;
