use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tempo_host::{Clock, EventLoop, HostError, ManualClock, Priority};

fn manual_loop() -> (EventLoop, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new());
    let event_loop = EventLoop::builder().clock(clock.clone()).build();
    (event_loop, clock)
}

fn recorder() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(log: &Rc<RefCell<Vec<String>>>, entry: &str) -> Box<dyn FnOnce()> {
    let log = log.clone();
    let entry = entry.to_string();
    Box::new(move || log.borrow_mut().push(entry))
}

#[test]
fn test_microtasks_run_before_macrotasks() {
    let (event_loop, _clock) = manual_loop();
    let log = recorder();

    event_loop.post_message(push(&log, "message"));
    {
        let log = log.clone();
        let el = event_loop.clone();
        event_loop.queue_microtask(Box::new(move || {
            log.borrow_mut().push("micro1".into());
            // Chained microtasks still drain within the same checkpoint
            el.queue_microtask(push(&log, "micro2"));
        }));
    }

    event_loop.run_until_idle();
    assert_eq!(*log.borrow(), vec!["micro1", "micro2", "message"]);
}

#[test]
fn test_macrotask_selection_order() {
    let (event_loop, _clock) = manual_loop();
    let log = recorder();

    event_loop
        .request_idle_callback(push(&log, "idle"), Duration::from_secs(1))
        .unwrap();
    event_loop.post_message(push(&log, "message"));
    event_loop.set_timeout(Duration::ZERO, push(&log, "timer"));
    event_loop
        .post_task(Priority::Background, push(&log, "background"))
        .unwrap();
    event_loop
        .post_task(Priority::UserBlocking, push(&log, "blocking"))
        .unwrap();

    event_loop.run_until_idle();
    assert_eq!(
        *log.borrow(),
        vec!["timer", "blocking", "background", "message", "idle"]
    );
}

#[test]
fn test_timers_fire_in_deadline_order_and_can_be_cleared() {
    let (event_loop, clock) = manual_loop();
    let log = recorder();

    event_loop.set_timeout(Duration::from_millis(30), push(&log, "30a"));
    let cleared = event_loop.set_timeout(Duration::from_millis(10), push(&log, "10"));
    event_loop.set_timeout(Duration::from_millis(20), push(&log, "20"));
    event_loop.set_timeout(Duration::from_millis(30), push(&log, "30b"));

    assert!(event_loop.clear_timeout(cleared));
    assert!(!event_loop.clear_timeout(cleared));

    event_loop.run_until_idle();
    assert_eq!(*log.borrow(), vec!["20", "30a", "30b"]);
    assert_eq!(clock.now(), Duration::from_millis(30));
    assert!(!event_loop.pending());
}

#[test]
fn test_run_until_leaves_later_timers_pending() {
    let (event_loop, _clock) = manual_loop();
    let log = recorder();

    event_loop.set_timeout(Duration::from_millis(5), push(&log, "early"));
    event_loop.set_timeout(Duration::from_millis(50), push(&log, "late"));

    event_loop.run_until(Duration::from_millis(10));
    assert_eq!(*log.borrow(), vec!["early"]);
    assert!(event_loop.pending());

    event_loop.run_until_idle();
    assert_eq!(*log.borrow(), vec!["early", "late"]);
}

fn busy_loop(
    event_loop: &EventLoop,
    clock: &Rc<ManualClock>,
    log: &Rc<RefCell<Vec<String>>>,
    remaining: u32,
) {
    let el = event_loop.clone();
    let clock = clock.clone();
    let log = log.clone();
    event_loop.post_message(Box::new(move || {
        clock.advance(Duration::from_millis(5));
        log.borrow_mut().push(format!("busy{remaining}"));
        if remaining > 0 {
            busy_loop(&el, &clock, &log, remaining - 1);
        }
    }));
}

#[test]
fn test_idle_callback_timeout_under_constant_load() {
    let (event_loop, clock) = manual_loop();
    let log = recorder();

    event_loop
        .request_idle_callback(push(&log, "idle"), Duration::from_millis(16))
        .unwrap();
    busy_loop(&event_loop, &clock, &log, 9);

    event_loop.run_until_idle();

    let log = log.borrow();
    let idle_at = log.iter().position(|e| e == "idle").unwrap();
    // Four 5ms messages push the clock past the 16ms timeout
    assert_eq!(idle_at, 4);
    assert_eq!(log.len(), 11);
}

#[test]
fn test_disabled_facilities_report_unsupported() {
    let event_loop = EventLoop::builder()
        .post_task(false)
        .idle_callback(false)
        .build();

    assert!(!event_loop.capabilities().post_task);
    let rejected = event_loop
        .post_task(Priority::UserBlocking, Box::new(|| {}))
        .unwrap_err();
    assert_eq!(rejected.error, HostError::Unsupported("post_task"));

    let rejected = event_loop
        .request_idle_callback(Box::new(|| {}), Duration::from_millis(16))
        .unwrap_err();
    assert_eq!(rejected.error, HostError::Unsupported("request_idle_callback"));
    assert!(!event_loop.pending());
}

#[test]
fn test_rejected_task_is_handed_back() {
    let event_loop = EventLoop::builder().post_task(false).build();
    let log = recorder();

    let rejected = event_loop
        .post_task(Priority::UserBlocking, push(&log, "rerouted"))
        .unwrap_err();
    event_loop.post_message(rejected.task);

    event_loop.run_until_idle();
    assert_eq!(*log.borrow(), vec!["rerouted".to_string()]);
}

#[test]
fn test_dropping_the_loop_drops_queued_tasks() {
    let event_loop = EventLoop::new();
    let weak = event_loop.downgrade();
    let marker = Rc::new(());

    let held = marker.clone();
    event_loop.post_message(Box::new(move || drop(held)));
    event_loop.set_timeout(Duration::from_secs(60), Box::new(|| {}));
    assert_eq!(Rc::strong_count(&marker), 2);
    assert!(weak.upgrade().is_some());

    drop(event_loop);
    assert!(weak.upgrade().is_none());
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[test]
fn test_turn_on_empty_loop() {
    let event_loop = EventLoop::new();
    assert!(!event_loop.turn());
    assert_eq!(event_loop.run_until_idle(), 0);
    assert_eq!(event_loop.macrotasks_run(), 0);
}
