//! Integration Tests for Reactive System
//!
//! These tests verify that signals, effects, owners, computed values and
//! resources work together through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::oneshot;
use pretty_assertions::assert_eq;

use tendril_core::graph::NodeKind;
use tendril_core::reactive::{edges_consistent, node_count, pending_effect_count};
use tendril_core::{
    configure, create_computed, create_effect, create_owner, create_resource, create_signal,
    create_signal_with, execute_mount_callbacks, on_cleanup, on_mount, run_with_owner, tick,
    untrack, with_registry, FetchInfo, NameRegistry, RuntimeConfig, SignalOptions,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two writes of the same value and a third write in one turn produce one
/// re-run with the final value.
#[test]
fn equal_writes_and_batching_log_initial_then_final() {
    let (count, set_count) = create_signal(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let log_c = log.clone();
    create_effect(move || log_c.borrow_mut().push(count.get()));

    set_count.set(1);
    set_count.set(1);
    set_count.set(2);
    tick();

    assert_eq!(*log.borrow(), vec![0, 2]);
}

#[test]
fn nan_write_is_not_a_change() {
    let (value, set_value) = create_signal(f64::NAN);
    let runs = Rc::new(Cell::new(0));

    let runs_c = runs.clone();
    create_effect(move || {
        value.get();
        runs_c.set(runs_c.get() + 1);
    });

    set_value.set(f64::NAN);
    assert_eq!(pending_effect_count(), 0);
    tick();
    assert_eq!(runs.get(), 1);
}

#[test]
fn effect_on_two_signals_runs_once_with_both_values() {
    let (first, set_first) = create_signal(String::from("Ada"));
    let (last, set_last) = create_signal(String::from("Lovelace"));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let seen_c = seen.clone();
    create_effect(move || {
        seen_c
            .borrow_mut()
            .push(format!("{} {}", first.get(), last.get()));
    });

    set_first.set(String::from("Grace"));
    set_last.set(String::from("Hopper"));
    tick();

    assert_eq!(
        *seen.borrow(),
        vec!["Ada Lovelace".to_string(), "Grace Hopper".to_string()]
    );
}

#[test]
fn branch_switch_retracks_dependencies() {
    let (use_a, set_use_a) = create_signal(true);
    let (a, set_a) = create_signal(1);
    let (b, set_b) = create_signal(100);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (a_probe, b_probe) = (a.clone(), b.clone());
    let seen_c = seen.clone();
    create_effect(move || {
        let value = if use_a.get() { a.get() } else { b.get() };
        seen_c.borrow_mut().push(value);
    });

    set_use_a.set(false);
    tick();
    assert_eq!(a_probe.subscriber_count(), 0);
    assert_eq!(b_probe.subscriber_count(), 1);

    set_a.set(2);
    tick();
    set_b.set(200);
    tick();

    assert_eq!(*seen.borrow(), vec![1, 100, 200]);
    assert!(edges_consistent());
}

/// Effects that write each other's inputs form a signal/effect cycle; owner
/// disposal has to break it completely.
#[test]
fn owner_dispose_breaks_cycles() {
    let owner = create_owner();
    let signals_before = node_count(NodeKind::Signal);

    let (ping, pong) = run_with_owner(&owner, || {
        let (ping, set_ping) = create_signal(0);
        let (pong, set_pong) = create_signal(0);

        let (ping_r, pong_w) = (ping.clone(), set_pong.clone());
        create_effect(move || {
            let value = ping_r.get();
            if value < 3 {
                pong_w.set(value + 1);
            }
        });
        let (pong_r, ping_w) = (pong.clone(), set_ping.clone());
        create_effect(move || {
            let value = pong_r.get();
            if value > 0 && value < 3 {
                ping_w.set(value);
            }
        });
        (ping, pong)
    });
    tick();
    assert_eq!(owner.effect_count(), 2);

    owner.dispose();

    assert_eq!(ping.subscriber_count(), 0);
    assert_eq!(pong.subscriber_count(), 0);
    assert_eq!(owner.effect_count(), 0);
    assert_eq!(node_count(NodeKind::Effect), 0);
    assert!(edges_consistent());

    // The write handles lived inside the effects and are gone with them.
    drop(ping);
    drop(pong);
    assert_eq!(node_count(NodeKind::Signal), signals_before);
}

#[test]
fn resource_ignores_out_of_order_responses() {
    let senders: Rc<RefCell<Vec<oneshot::Sender<Result<String, String>>>>> = Rc::default();
    let (user_id, set_user_id) = create_signal(1_u32);

    let senders_c = senders.clone();
    let (user, _actions) = create_resource(
        move || user_id.get(),
        move |id: u32, _info: FetchInfo<String>| {
            let (tx, rx) = oneshot::channel();
            senders_c.borrow_mut().push(tx);
            async move {
                let reply: Result<String, String> =
                    rx.await.unwrap_or_else(|_| Err("dropped".to_string()));
                reply.map(|name| format!("{id}:{name}"))
            }
        },
    );

    set_user_id.set(2);
    tick();
    assert!(user.loading());

    let stale = senders.borrow_mut().remove(0);
    let latest = senders.borrow_mut().remove(0);

    latest.send(Ok("grace".to_string())).unwrap();
    tick();
    stale.send(Ok("ada".to_string())).unwrap();
    tick();

    let state = user.state();
    assert_eq!(state.data, Some("2:grace".to_string()));
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[test]
fn mount_callbacks_fire_once_and_cleanup_on_dispose() {
    let owner = create_owner();
    let log = Rc::new(RefCell::new(Vec::new()));

    run_with_owner(&owner, || {
        let l = log.clone();
        on_mount(move || l.borrow_mut().push("mount"));
        let l = log.clone();
        on_cleanup(move || l.borrow_mut().push("cleanup"));
    });

    execute_mount_callbacks(&owner);
    execute_mount_callbacks(&owner);
    owner.dispose();
    owner.dispose();

    assert_eq!(*log.borrow(), vec!["mount", "cleanup"]);
}

#[test]
fn runaway_effect_is_cut_off() {
    init_tracing();
    configure(RuntimeConfig::default().with_max_flush_rounds(5));

    let (count, set_count) = create_signal(0_u64);
    let probe = count.clone();
    let (effect, _) = create_effect(move || set_count.set(count.get() + 1));

    tick();

    // One run at creation, then one per round until the sixth round
    // exceeds the limit of five.
    assert_eq!(effect.run_count(), 7);
    assert_eq!(probe.get(), 7);
    assert_eq!(pending_effect_count(), 0);
    assert!(effect.is_active());
}

#[test]
fn named_signals_read_back_through_registry() {
    let registry = Rc::new(NameRegistry::new());

    let set_width = with_registry(registry.clone(), || {
        let (_, set_width) = create_signal_with(320_u32, SignalOptions::named("width"));
        create_signal_with(String::from("left"), SignalOptions::named("align"));
        set_width
    });
    set_width.set(480);

    assert_eq!(registry.names(), vec!["width".to_string(), "align".to_string()]);
    assert_eq!(registry.get::<u32>("width"), Some(480));
    assert_eq!(registry.get::<String>("align"), Some("left".to_string()));
}

#[test]
fn failing_callbacks_do_not_stop_the_batch() {
    init_tracing();
    let (tick_count, set_tick_count) = create_signal(0);
    let survivors = Rc::new(Cell::new(0));
    let owner = create_owner();

    run_with_owner(&owner, || {
        let t = tick_count.clone();
        create_effect(move || -> Result<(), std::io::Error> {
            if t.get() > 0 {
                return Err(std::io::Error::other("disk on fire"));
            }
            Ok(())
        });
        let t = tick_count.clone();
        create_effect(move || {
            assert!(t.get() < 1, "tick overflow");
        });
        let (t, s) = (tick_count.clone(), survivors.clone());
        create_effect(move || s.set(t.get()));
        on_cleanup(|| -> Result<(), String> { Err("cleanup failed".to_string()) });
    });

    set_tick_count.set(1);
    tick();
    assert_eq!(survivors.get(), 1);

    owner.dispose();
    assert_eq!(tick_count.subscriber_count(), 0);
}

#[test]
fn computed_feeds_effects_only_on_change() {
    let (items, set_items) = create_signal(vec![3, 1, 2]);
    let total = create_computed(move || items.get().iter().sum::<i32>());
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (reader, seen_c) = (total.clone(), seen.clone());
    create_effect(move || seen_c.borrow_mut().push(reader.get()));

    set_items.set(vec![2, 2, 2]);
    tick();
    set_items.set(vec![10]);
    tick();

    assert_eq!(*seen.borrow(), vec![Some(6), Some(10)]);
}

#[test]
fn untrack_reads_do_not_subscribe() {
    let (tracked, set_tracked) = create_signal(0);
    let (ignored, set_ignored) = create_signal(0);
    let runs = Rc::new(Cell::new(0));

    let runs_c = runs.clone();
    create_effect(move || {
        tracked.get();
        untrack(|| ignored.get());
        runs_c.set(runs_c.get() + 1);
    });

    set_ignored.set(1);
    tick();
    assert_eq!(runs.get(), 1);

    set_tracked.set(1);
    tick();
    assert_eq!(runs.get(), 2);
}
