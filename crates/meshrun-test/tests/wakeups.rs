use std::sync::Arc;
use std::thread;
use std::time::Duration;

use meshrun_test::{wait_until, EngineWork, TestStack, DEFAULT_PATIENCE};

#[test]
fn test_every_signal_gets_a_drain() {
    let stack = TestStack::start().unwrap();

    for round in 0..100u32 {
        stack.engine.post(EngineWork::Tasklet(round));
        assert!(stack.wait_drain_passes(u64::from(round) + 1));
    }

    assert_eq!(stack.engine.processed().len(), 100);
    assert_eq!(stack.engine.queued(), 0);
}

#[test]
fn test_isr_signal_gets_a_drain() {
    let stack = TestStack::start().unwrap();

    stack.engine.post_from_isr(EngineWork::RadioFrame(vec![0x61, 0xdc, 0x01]));
    assert!(stack.wait_drain_passes(1));
    assert_eq!(
        stack.engine.processed(),
        vec![EngineWork::RadioFrame(vec![0x61, 0xdc, 0x01])]
    );
}

#[test]
fn test_concurrent_signals_mid_drain_cause_one_more_pass() {
    let stack = TestStack::start().unwrap();
    stack.engine.pause_drains();

    stack.engine.post(EngineWork::Tasklet(0));
    stack.engine.wait_drains_entered(1);

    let posters: Vec<_> = (1..=2)
        .map(|id| {
            let engine = Arc::clone(&stack.engine);
            thread::spawn(move || engine.post(EngineWork::Tasklet(id)))
        })
        .collect();
    for poster in posters {
        poster.join().unwrap();
    }

    stack.engine.resume_drains();
    assert!(stack.wait_drain_passes(2));
    assert!(stack.wait_idle());

    thread::sleep(Duration::from_millis(50));
    let stats = stack.manager.stats();
    assert_eq!(stats.drain_passes, 2);
    assert_eq!(stats.wakeups, 2);
    assert_eq!(stack.engine.processed().len(), 3);
}

#[test]
fn test_repeated_signals_saturate_into_one_drain() {
    let stack = TestStack::start().unwrap();
    let guard = stack.manager.stack_guard().unwrap();

    // The first signal wakes the task, which then blocks on the gate.
    stack.manager.signal_activity_pending();
    assert!(wait_until(DEFAULT_PATIENCE, || stack.manager.stats().wakeups == 1));

    for _ in 0..10 {
        stack.manager.signal_activity_pending();
        stack.manager.signal_activity_pending_from_isr();
    }
    drop(guard);

    assert!(stack.wait_drain_passes(2));
    assert!(stack.wait_idle());
    thread::sleep(Duration::from_millis(50));
    assert_eq!(stack.manager.stats().drain_passes, 2);
}

#[test]
fn test_isr_entry_never_waits_on_the_gate() {
    let stack = TestStack::start().unwrap();
    let guard = stack.manager.stack_guard().unwrap();

    let manager = Arc::clone(&stack.manager);
    let isr = thread::spawn(move || {
        for _ in 0..1000 {
            manager.signal_activity_pending_from_isr();
        }
    });
    assert!(wait_until(DEFAULT_PATIENCE, || isr.is_finished()));
    isr.join().unwrap();

    assert_eq!(stack.engine.drain_passes(), 0);
    drop(guard);
    assert!(stack.wait_drain_passes(1));
}
