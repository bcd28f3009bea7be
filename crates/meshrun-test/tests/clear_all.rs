use std::sync::Arc;
use std::thread;
use std::time::Duration;

use meshrun_core::{MeshError, StackConfig};
use meshrun_runtime::Notified;
use meshrun_test::{wait_until, TestStack, DEFAULT_PATIENCE};

fn handshake_stack() -> TestStack {
    TestStack::start_with(StackConfig::default().with_clear_all_handshake(true)).unwrap()
}

fn add_records(stack: &TestStack, records: &[u64]) {
    let _guard = stack.manager.stack_guard().unwrap();
    for record in records {
        stack.engine.add_record(*record);
    }
}

#[test]
fn test_clear_all_completes_through_drain() {
    let stack = handshake_stack();
    add_records(&stack, &[1, 2, 3]);

    let ticket = stack.manager.arm_clear_all().unwrap();
    stack.engine.clear_all_records();
    ticket.wait().unwrap();

    assert!(stack.engine.records().is_empty());
}

#[test]
fn test_sequential_clear_alls_each_need_a_notify() {
    let stack = handshake_stack();

    for batch in [[10u64, 11], [20, 21]] {
        add_records(&stack, &batch);
        let ticket = stack.manager.arm_clear_all().unwrap();
        stack.engine.clear_all_records();
        ticket.wait().unwrap();
        assert!(stack.engine.records().is_empty());
    }
    assert!(stack.manager.stats().drain_passes >= 2);
}

#[test]
fn test_stale_completion_does_not_satisfy_next_wait() {
    let stack = handshake_stack();
    assert_eq!(
        stack.manager.notify_clear_all_complete(),
        Ok(Notified::NoWaiter)
    );

    let manager = Arc::clone(&stack.manager);
    let waiter = thread::spawn(move || manager.wait_on_clear_all_complete());

    assert!(wait_until(DEFAULT_PATIENCE, || stack.manager.is_clear_all_armed()));
    thread::sleep(Duration::from_millis(30));
    assert!(!waiter.is_finished());

    stack.engine.clear_all_records();
    assert_eq!(waiter.join().unwrap(), Ok(()));
}

#[test]
fn test_abandoned_armed_cycle_does_not_leak_into_next_wait() {
    let stack = handshake_stack();

    let ticket = stack.manager.arm_clear_all().unwrap();
    stack.engine.clear_all_records();
    assert!(stack.wait_drain_passes(1));
    drop(ticket);

    let manager = Arc::clone(&stack.manager);
    let waiter = thread::spawn(move || manager.wait_on_clear_all_complete());
    assert!(wait_until(DEFAULT_PATIENCE, || stack.manager.is_clear_all_armed()));
    thread::sleep(Duration::from_millis(30));
    assert!(!waiter.is_finished());

    stack.engine.clear_all_records();
    assert_eq!(waiter.join().unwrap(), Ok(()));
}

#[test]
fn test_clear_all_disabled_reports_capability_disabled() {
    let stack = TestStack::start().unwrap();

    assert!(matches!(
        stack.manager.arm_clear_all(),
        Err(MeshError::CapabilityDisabled)
    ));
    assert_eq!(
        stack.manager.wait_on_clear_all_complete(),
        Err(MeshError::CapabilityDisabled)
    );

    // The engine still clears; only the handshake is absent.
    add_records(&stack, &[5]);
    stack.engine.clear_all_records();
    assert!(stack.wait_drain_passes(1));
    assert!(stack.engine.records().is_empty());
}
