mod common;

use common::Harness;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tempo_host::Clock;
use tempo_scheduler::{Debounced, Throttled, debounce_task, throttle_task};

fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
    let count = Rc::new(Cell::new(0));
    let inc = {
        let count = count.clone();
        move || count.set(count.get() + 1)
    };
    (count, inc)
}

#[test]
fn test_debounce_collapses_a_burst_of_calls() {
    let h = Harness::new();
    let (count, inc) = counter();
    let trigger = debounce_task(&h.scheduler, inc, Duration::from_millis(100));

    for _ in 0..5 {
        trigger();
        h.clock.advance(Duration::from_millis(10));
    }

    // Quiet window not over yet
    h.event_loop.run_until(h.clock.now());
    assert_eq!(count.get(), 0);

    h.event_loop.run_until_idle();
    assert_eq!(count.get(), 1);
    // Last call at 40ms plus the 100ms delay
    assert_eq!(h.clock.now(), Duration::from_millis(140));
}

#[test]
fn test_debounce_fires_again_after_quiet_window() {
    let h = Harness::new();
    let (count, inc) = counter();
    let trigger = debounce_task(&h.scheduler, inc, Duration::from_millis(50));

    trigger();
    h.event_loop.run_until_idle();
    trigger();
    h.event_loop.run_until_idle();

    assert_eq!(count.get(), 2);
}

#[test]
fn test_debounce_uses_latest_arguments() {
    let h = Harness::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let debounced = {
        let log = log.clone();
        Debounced::new(&h.scheduler, Duration::from_millis(50), move |query: String| {
            log.borrow_mut().push(query)
        })
    };

    for query in ["s", "se", "sea", "search"] {
        debounced.call(query.to_string());
    }
    assert!(debounced.is_pending());

    h.event_loop.run_until_idle();

    assert_eq!(*log.borrow(), vec!["search".to_string()]);
    assert!(!debounced.is_pending());
}

#[test]
fn test_debounce_cancel_drops_pending_call() {
    let h = Harness::new();
    let (count, inc) = counter();
    let debounced = Debounced::new(&h.scheduler, Duration::from_millis(50), move |()| inc());

    debounced.call(());
    assert!(debounced.cancel());
    assert!(!debounced.cancel());

    h.event_loop.run_until_idle();
    assert_eq!(count.get(), 0);
}

#[test]
fn test_throttle_drops_calls_during_cooldown() {
    let h = Harness::new();
    let (count, inc) = counter();
    let trigger = throttle_task(&h.scheduler, inc, Duration::from_millis(100));

    for _ in 0..5 {
        trigger();
    }
    h.event_loop.run_until_idle();
    assert_eq!(count.get(), 1);

    trigger();
    h.event_loop.run_until_idle();
    assert_eq!(count.get(), 2);
}

#[test]
fn test_throttle_forwards_arguments_of_accepted_call() {
    let h = Harness::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let throttled = {
        let log = log.clone();
        Throttled::new(&h.scheduler, Duration::from_millis(100), move |n: u32| {
            log.borrow_mut().push(n)
        })
    };

    assert!(throttled.call(1));
    assert!(!throttled.call(2));
    assert!(throttled.is_cooling_down());

    h.clock.advance(Duration::from_millis(60));
    h.event_loop.run_until(h.clock.now());
    assert!(!throttled.call(3));

    h.event_loop.run_until_idle();
    assert!(!throttled.is_cooling_down());
    assert!(throttled.call(4));
    h.event_loop.run_until_idle();

    assert_eq!(*log.borrow(), vec![1, 4]);
}

#[test]
fn test_wrappers_run_through_the_scheduler() {
    let h = Harness::new();
    let (count, inc) = counter();
    let trigger = h.scheduler.throttle_task(inc);

    trigger();
    // Accepted, but still waiting in the scheduler queue
    assert_eq!(count.get(), 0);
    assert_eq!(h.scheduler.pending(), 1);

    h.event_loop.run_until_idle();
    assert_eq!(count.get(), 1);
    assert_eq!(h.scheduler.stats().tasks_run, 1);
}

#[test]
fn test_default_delays_come_from_config() {
    let h = Harness::new();
    let (count, inc) = counter();
    let trigger = h.scheduler.debounce_task(inc);

    trigger();
    h.event_loop.run_until_idle();

    assert_eq!(count.get(), 1);
    assert_eq!(h.clock.now(), Duration::from_millis(100));
}
