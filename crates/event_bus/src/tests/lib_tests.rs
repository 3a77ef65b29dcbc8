use super::*;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static)
{
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |value: T| sink.lock().expect("lock").push(value))
}

fn snapshot<T: Clone>(seen: &Arc<Mutex<Vec<T>>>) -> Vec<T> {
    seen.lock().expect("lock").clone()
}

#[test]
fn sticky_channel_replays_last_value_once_before_new_posts() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<String>(true);

    assert_eq!(bus.post(&channel, "first".into()), PostOutcome::Retained);
    assert_eq!(bus.post(&channel, "second".into()), PostOutcome::Retained);

    let (seen, callback) = recorder::<String>();
    bus.subscribe(&Owner::new(ui.handle()), &channel, callback, false)
        .expect("subscribe");
    assert_eq!(snapshot(&seen), vec!["second".to_string()]);

    bus.post(&channel, "third".into());
    assert_eq!(
        snapshot(&seen),
        vec!["second".to_string(), "third".to_string()]
    );
}

#[test]
fn sticky_replay_on_ui_thread_precedes_later_posts() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<u32>(true);
    bus.post(&channel, 1);

    let (seen, callback) = recorder::<u32>();
    bus.subscribe(&Owner::new(ui.handle()), &channel, callback, true)
        .expect("subscribe");
    bus.post(&channel, 2);
    assert!(snapshot(&seen).is_empty());

    ui.run_pending();
    assert_eq!(snapshot(&seen), vec![1, 2]);
}

#[test]
fn non_sticky_post_without_subscribers_is_dropped() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<&'static str>(false);

    assert_eq!(bus.post(&channel, "finish"), PostOutcome::Dropped);

    let (seen, callback) = recorder::<&'static str>();
    bus.subscribe(&Owner::new(ui.handle()), &channel, callback, true)
        .expect("subscribe");
    ui.run_pending();
    assert!(snapshot(&seen).is_empty());
}

#[test]
fn non_sticky_value_is_not_redelivered_to_recreated_owner() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<&'static str>(false);

    let (first_seen, first) = recorder::<&'static str>();
    let first_owner = Owner::new(ui.handle());
    bus.subscribe(&first_owner, &channel, first, true)
        .expect("subscribe");
    assert_eq!(bus.post(&channel, "open-detail"), PostOutcome::Delivered(1));
    ui.run_pending();
    assert_eq!(snapshot(&first_seen), vec!["open-detail"]);

    bus.unsubscribe_all(first_owner.id());
    let (second_seen, second) = recorder::<&'static str>();
    bus.subscribe(&Owner::new(ui.handle()), &channel, second, true)
        .expect("subscribe");
    ui.run_pending();
    assert!(snapshot(&second_seen).is_empty());
}

#[test]
fn post_reaches_each_subscriber_exactly_once() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<u8>(false);
    let hits = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let hits = Arc::clone(&hits);
        bus.subscribe(
            &Owner::new(ui.handle()),
            &channel,
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            },
            false,
        )
        .expect("subscribe");
    }

    assert_eq!(bus.post(&channel, 9), PostOutcome::Delivered(3));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn resubscribing_same_owner_replaces_previous_callback() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<u8>(false);
    let owner = Owner::new(ui.handle());

    let (old_seen, old) = recorder::<u8>();
    let (new_seen, new) = recorder::<u8>();
    bus.subscribe(&owner, &channel, old, false).expect("first");
    bus.subscribe(&owner, &channel, new, false).expect("second");

    assert_eq!(bus.subscriber_count(channel.key()), 1);
    bus.post(&channel, 5);
    assert!(snapshot(&old_seen).is_empty());
    assert_eq!(snapshot(&new_seen), vec![5]);
}

#[test]
fn unsubscribe_all_removes_owner_from_every_channel() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let finish = bus.declare::<()>(false);
    let loading = bus.declare::<Option<String>>(true);
    let owner = Owner::new(ui.handle());
    let other = Owner::new(ui.handle());

    bus.subscribe(&owner, &finish, |_| {}, true).expect("finish");
    bus.subscribe(&owner, &loading, |_| {}, true).expect("loading");
    bus.subscribe(&other, &finish, |_| {}, true).expect("other");

    assert_eq!(bus.unsubscribe_all(owner.id()), 2);
    assert_eq!(bus.unsubscribe_all(owner.id()), 0);
    assert_eq!(bus.subscriber_count(finish.key()), 1);
    assert_eq!(bus.subscriber_count(loading.key()), 0);
}

#[test]
fn queued_ui_delivery_is_skipped_after_teardown() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<u8>(false);
    let owner = Owner::new(ui.handle());
    let (seen, callback) = recorder::<u8>();
    bus.subscribe(&owner, &channel, callback, true)
        .expect("subscribe");

    bus.post(&channel, 1);
    bus.unsubscribe_all(owner.id());
    ui.run_pending();
    assert!(snapshot(&seen).is_empty());
}

#[test]
fn post_from_worker_thread_is_delivered_on_ui_thread() {
    let ui = UiLoop::new();
    let ui_thread = thread::current().id();
    let bus = EventBus::new();
    let channel = bus.declare::<u32>(false);
    let (seen, record) = recorder::<(u32, thread::ThreadId)>();
    bus.subscribe(
        &Owner::new(ui.handle()),
        &channel,
        move |value| record((value, thread::current().id())),
        true,
    )
    .expect("subscribe");

    let worker_bus = bus.clone();
    let worker_channel = channel.clone();
    thread::spawn(move || worker_bus.post(&worker_channel, 42))
        .join()
        .expect("worker");

    assert!(ui.run_until(Duration::from_secs(1), || !snapshot(&seen).is_empty()));
    assert_eq!(snapshot(&seen), vec![(42, ui_thread)]);
}

#[test]
fn concurrent_posts_and_subscriptions_do_not_lose_deliveries() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<usize>(false);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    bus.subscribe(
        &Owner::new(ui.handle()),
        &channel,
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        false,
    )
    .expect("subscribe");

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let bus = bus.clone();
            let channel = channel.clone();
            let handle = ui.handle();
            thread::spawn(move || {
                for i in 0..100 {
                    bus.post(&channel, worker * 100 + i);
                    if i % 10 == 0 {
                        let owner = Owner::new(handle.clone());
                        bus.subscribe(&owner, &channel, |_| {}, false)
                            .expect("subscribe");
                        bus.unsubscribe_all(owner.id());
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }

    assert_eq!(hits.load(Ordering::SeqCst), 400);
}

#[test]
fn callback_may_post_to_its_own_channel() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<u32>(false);
    let (seen, record) = recorder::<u32>();
    let inner_bus = bus.clone();
    let inner_channel = channel.clone();
    bus.subscribe(
        &Owner::new(ui.handle()),
        &channel,
        move |value| {
            record(value);
            if value < 3 {
                inner_bus.post(&inner_channel, value + 1);
            }
        },
        false,
    )
    .expect("subscribe");

    bus.post(&channel, 1);
    assert_eq!(snapshot(&seen), vec![1, 2, 3]);
}

#[test]
fn retired_channel_rejects_posts_and_subscriptions() {
    let ui = UiLoop::new();
    let bus = EventBus::new();
    let channel = bus.declare::<u8>(true);
    assert!(bus.retire(channel.key()));
    assert!(!bus.is_declared(channel.key()));

    assert_eq!(
        bus.try_post(&channel, 1),
        Err(BusError::Undeclared(channel.key().clone()))
    );
    assert!(bus
        .subscribe(&Owner::new(ui.handle()), &channel, |_| {}, false)
        .is_err());
}

#[test]
#[should_panic(expected = "never declared")]
fn post_to_retired_channel_panics() {
    let bus = EventBus::new();
    let channel = bus.declare::<u8>(false);
    bus.retire(channel.key());
    bus.post(&channel, 1);
}

#[test]
fn channel_keys_are_unique_per_declaration() {
    let bus = EventBus::new();
    let first = bus.declare::<()>(false);
    let second = bus.declare::<()>(false);
    assert_ne!(first.key(), second.key());
}
