use super::*;
use std::{sync::atomic::AtomicUsize, time::Duration};

use event_bus::{Owner, UiLoop};
use shared::{envelope::ResponseEnvelope, paging::NO_MORE_PAGES};
use tokio::{
    sync::{oneshot, Notify},
    time::sleep,
};

use crate::scope::TaskState;

#[derive(Default)]
struct RecordingModel {
    cleared: AtomicUsize,
    results: Mutex<Vec<(&'static str, i32)>>,
}

impl Model for RecordingModel {
    fn on_cleared(&self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
    }

    fn on_result_ok(&self, _data: Option<&ScreenArgs>) {
        lock(&self.results).push(("ok", RESULT_OK));
    }

    fn on_result_canceled(&self, _data: Option<&ScreenArgs>) {
        lock(&self.results).push(("canceled", RESULT_CANCELED));
    }

    fn on_result(&self, code: i32, _data: Option<&ScreenArgs>) {
        lock(&self.results).push(("other", code));
    }
}

fn view_model() -> ViewModel<RecordingModel> {
    ViewModel::new(EventBus::new(), Handle::current(), RecordingModel::default())
}

#[tokio::test]
async fn navigation_posts_reach_subscribers() {
    let vm = view_model();
    let ui = UiLoop::new();
    let owner = Owner::new(ui.handle());
    let channels = vm.enable_navigation();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    vm.bus()
        .subscribe(&owner, &channels.start, move |req: ScreenRequest| lock(&sink).push(req), false)
        .expect("subscribe");

    let outcome = vm.start_screen(Route::new("detail"));
    assert_eq!(outcome, PostOutcome::Delivered(1));
    assert_eq!(lock(&seen).clone(), vec![ScreenRequest::new(Route::new("detail"))]);
}

#[tokio::test]
async fn enabling_a_group_twice_reuses_its_channels() {
    let vm = view_model();
    let first = vm.enable_loading();
    let second = vm.enable_loading();
    assert_eq!(first.show.key(), second.show.key());
    assert_eq!(first.dismiss.key(), second.dismiss.key());
}

#[tokio::test]
async fn channel_keys_differ_between_instances() {
    let (a, b) = (view_model(), view_model());
    assert_ne!(a.enable_navigation().start.key(), b.enable_navigation().start.key());
    assert_ne!(a.list_channels().refresh.key(), b.list_channels().refresh.key());
}

#[tokio::test]
#[should_panic(expected = "navigation channels are not enabled")]
async fn finishing_without_navigation_group_panics() {
    let vm = view_model();
    vm.finish(None, None);
}

#[tokio::test]
#[should_panic(expected = "loading channels are not enabled")]
async fn loading_without_loading_group_panics() {
    let vm = view_model();
    vm.show_default_loading();
}

#[tokio::test]
async fn one_shot_posts_without_listeners_are_dropped() {
    let vm = view_model();
    vm.enable_navigation();
    assert_eq!(vm.finish(Some(RESULT_OK), None), PostOutcome::Dropped);
    assert_eq!(vm.load_more_end(), PostOutcome::Dropped);
}

#[tokio::test]
async fn load_state_is_replayed_to_late_subscribers() {
    let vm = view_model();
    let channels = vm.enable_load_state();
    assert_eq!(
        vm.show_load_state(LoadState::Error("offline".into())),
        PostOutcome::Retained
    );

    let ui = UiLoop::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    vm.bus()
        .subscribe(
            &Owner::new(ui.handle()),
            &channels.state,
            move |state: LoadState| lock(&sink).push(state),
            false,
        )
        .expect("subscribe");

    assert_eq!(lock(&seen).clone(), vec![LoadState::Error("offline".into())]);
}

#[tokio::test]
async fn page_cursor_walks_to_the_end() {
    let vm = view_model();
    assert_eq!(vm.page_index(), 1);
    let walked: Vec<i32> = (0..5).map(|_| vm.next_page(3)).collect();
    assert_eq!(walked, vec![2, 3, NO_MORE_PAGES, NO_MORE_PAGES, NO_MORE_PAGES]);

    vm.reset_page();
    assert_eq!(vm.page_index(), 1);
}

#[tokio::test]
async fn screen_results_are_dispatched_by_code() {
    let vm = view_model();
    vm.deliver_screen_result(ScreenResult::ok(None));
    vm.deliver_screen_result(ScreenResult::canceled());
    vm.deliver_screen_result(ScreenResult { code: 42, data: None });

    assert_eq!(
        lock(&vm.model().results).clone(),
        vec![("ok", RESULT_OK), ("canceled", RESULT_CANCELED), ("other", 42)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clear_cancels_work_and_retires_channels_once() {
    let vm = view_model();
    let navigation = vm.enable_navigation();
    let refresh = vm.list_channels().refresh.clone();

    let fired = Arc::new(AtomicBool::new(false));
    let (release, gate) = oneshot::channel::<()>();
    let flag = Arc::clone(&fired);
    let handle = vm.launch(
        async move {
            let _ = gate.await;
            anyhow::Ok(Some(ResponseEnvelope::ok(1u8)))
        },
        None,
        move |_| flag.store(true, Ordering::SeqCst),
        |_| {},
    );

    vm.clear();
    vm.clear();
    let _ = release.send(());
    sleep(Duration::from_millis(30)).await;

    assert_eq!(vm.model().cleared.load(Ordering::SeqCst), 1);
    assert!(vm.is_cleared());
    assert!(vm.scope().is_cancelled());
    assert_eq!(handle.state(), TaskState::Cancelled);
    assert!(!fired.load(Ordering::SeqCst));
    assert!(!vm.bus().is_declared(navigation.finish.key()));
    assert!(!vm.bus().is_declared(refresh.key()));

    let late = vm.launch_ui(async {});
    assert_eq!(late.state(), TaskState::Cancelled);
}

#[derive(Default)]
struct ReleasingModel {
    release: Arc<Notify>,
    cleared: AtomicBool,
}

impl Model for ReleasingModel {
    fn on_cleared(&self) {
        self.release.notify_one();
        std::thread::sleep(Duration::from_millis(100));
        self.cleared.store(true, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn operation_resolving_during_on_cleared_gets_no_callback() {
    let vm = ViewModel::new(EventBus::new(), Handle::current(), ReleasingModel::default());
    let release = Arc::clone(&vm.model().release);
    let results = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));

    let (on_result, on_failure) = (Arc::clone(&results), Arc::clone(&failures));
    let handle = vm.launch(
        async move {
            release.notified().await;
            anyhow::Ok(Some(ResponseEnvelope::ok("late".to_string())))
        },
        None,
        move |_| {
            on_result.fetch_add(1, Ordering::SeqCst);
        },
        move |_| {
            on_failure.fetch_add(1, Ordering::SeqCst);
        },
    );

    vm.clear();
    sleep(Duration::from_millis(150)).await;

    assert!(vm.model().cleared.load(Ordering::SeqCst));
    assert_eq!(results.load(Ordering::SeqCst), 0);
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert_eq!(handle.state(), TaskState::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropping_the_view_model_clears_it() {
    let bus = EventBus::new();
    let model = RecordingModel::default();
    let vm = ViewModel::new(bus.clone(), Handle::current(), model);
    let key = vm.list_channels().load_more.key().clone();
    let scope = vm.scope().clone();
    let model = Arc::clone(vm.model());

    drop(vm);

    assert!(!bus.is_declared(&key));
    assert!(scope.is_cancelled());
    assert_eq!(model.cleared.load(Ordering::SeqCst), 1);
}
