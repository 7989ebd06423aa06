use affinity::{Error, ExecutionContext};
use std::sync::{Arc, Mutex};

#[test]
fn test_check_access_fails_without_ambient_context() {
    assert!(
        matches!(ExecutionContext::check_access(), Err(Error::WrongContext)),
        "No context is ambient on a plain thread"
    );
}

#[test]
fn test_check_access_succeeds_inside_callback() {
    let ctx = ExecutionContext::new().unwrap();
    let result = Arc::new(Mutex::new(None));

    let out = result.clone();
    ctx.send(
        move |_| *out.lock().unwrap() = Some(ExecutionContext::check_access().is_ok()),
        (),
    )
    .unwrap();

    assert_eq!(*result.lock().unwrap(), Some(true));
}

#[test]
fn test_check_access_fails_off_worker_thread() {
    let ctx = ExecutionContext::new().unwrap();

    // Ambient, but this is not the worker thread.
    let result = ctx.enter(ExecutionContext::check_access);

    assert!(
        matches!(result, Err(Error::WrongContext)),
        "Entering a context does not move the caller onto its worker thread"
    );
}

#[test]
fn test_check_access_uses_ambient_context() {
    let first = ExecutionContext::new().unwrap();
    let second = ExecutionContext::new().unwrap();
    let result = Arc::new(Mutex::new(None));

    // On first's worker, but with second installed as ambient.
    let (target, out) = (second.clone(), result.clone());
    first
        .send(
            move |_| {
                let access = target.enter(ExecutionContext::check_access);
                *out.lock().unwrap() = Some(access.is_ok());
            },
            (),
        )
        .unwrap();

    assert_eq!(*result.lock().unwrap(), Some(false));
}

#[test]
fn test_has_access_distinguishes_contexts() {
    let first = ExecutionContext::new().unwrap();
    let second = ExecutionContext::new().unwrap();
    let result = Arc::new(Mutex::new(None));

    let (a, b, out) = (first.clone(), second.clone(), result.clone());
    first
        .send(
            move |_| *out.lock().unwrap() = Some((a.has_access(), b.has_access())),
            (),
        )
        .unwrap();

    assert_eq!(*result.lock().unwrap(), Some((true, false)));
    assert!(!first.has_access());
}
