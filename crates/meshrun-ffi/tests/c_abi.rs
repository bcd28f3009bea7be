use std::ffi::{c_int, CStr};
use std::sync::Arc;

use serial_test::serial;

use meshrun_core::StackConfig;
use meshrun_ffi::*;
use meshrun_runtime::{registry, StackManager};
use meshrun_test::{wait_until, EngineWork, SimulatedEngine, DEFAULT_PATIENCE};

fn last_error() -> String {
    let ptr = mesh_get_last_error();
    assert!(!ptr.is_null());
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[test]
#[serial]
fn test_c_surface_before_and_after_install() {
    // Nothing installed: lifecycle calls fail, engine callbacks are no-ops.
    assert_eq!(mesh_stack_init(), MeshErrorCode::NotInitialized as c_int);
    assert_eq!(last_error(), "Stack not initialized");
    mesh_tasklets_signal_pending(std::ptr::null_mut());
    mesh_sys_event_signal_pending();
    mesh_stack_lock();
    mesh_stack_unlock();

    let engine = Arc::new(SimulatedEngine::new());
    let manager = StackManager::new(
        engine.clone(),
        StackConfig::default().with_clear_all_handshake(true),
    );
    registry::install(manager).unwrap();

    assert_eq!(mesh_stack_start_task(), MeshErrorCode::NotInitialized as c_int);
    assert_eq!(mesh_stack_init(), 0);
    assert_eq!(mesh_stack_init(), MeshErrorCode::AlreadyInitialized as c_int);
    assert_eq!(mesh_stack_start_task(), 0);
    assert_eq!(mesh_stack_start_task(), MeshErrorCode::AlreadyStarted as c_int);

    // Engine wake callbacks reach the processing task.
    mesh_tasklets_signal_pending(std::ptr::null_mut());
    assert!(wait_until(DEFAULT_PATIENCE, || engine.drain_passes() == 1));
    mesh_sys_event_signal_pending();
    assert!(wait_until(DEFAULT_PATIENCE, || engine.drain_passes() == 2));

    // Lock, stray double unlock.
    mesh_stack_lock();
    engine.post(EngineWork::Tasklet(4));
    mesh_stack_unlock();
    mesh_stack_unlock();
    assert!(wait_until(DEFAULT_PATIENCE, || engine.drain_passes() == 3));

    // Clear-all handshake.
    assert_eq!(mesh_stack_notify_clear_all_complete(), 0);
    assert_eq!(mesh_stack_arm_clear_all(), 0);
    engine.clear_all_records();
    assert_eq!(mesh_stack_wait_on_clear_all_complete(), 0);

    // Re-arming abandons a cycle whose completion was never waited on.
    assert_eq!(mesh_stack_arm_clear_all(), 0);
    engine.clear_all_records();
    assert!(wait_until(DEFAULT_PATIENCE, || engine.drain_passes() >= 5));
    assert_eq!(mesh_stack_arm_clear_all(), 0);
    assert_eq!(mesh_stack_notify_clear_all_complete(), 1);
    assert_eq!(mesh_stack_wait_on_clear_all_complete(), 0);

    mesh_clear_error();
}
