use affinity::{Error, ExecutionContext};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_send_waits_for_callback() {
    let ctx = ExecutionContext::new().unwrap();
    let finished = Arc::new(AtomicBool::new(false));

    let flag = finished.clone();
    ctx.send(
        move |_| {
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
        },
        (),
    )
    .unwrap();

    assert!(
        finished.load(Ordering::SeqCst),
        "Send should return only after the callback finished"
    );
}

#[test]
fn test_send_observes_earlier_posts() {
    let ctx = ExecutionContext::new().unwrap();
    let counter = Arc::new(Mutex::new(0));

    for _ in 0..20 {
        let counter = counter.clone();
        ctx.post(
            move |_| {
                thread::sleep(Duration::from_millis(1));
                *counter.lock().unwrap() += 1;
            },
            (),
        )
        .unwrap();
    }

    let seen = Arc::new(Mutex::new(None));
    let (counter_in, seen_in) = (counter.clone(), seen.clone());
    ctx.send(
        move |_| *seen_in.lock().unwrap() = Some(*counter_in.lock().unwrap()),
        (),
    )
    .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        Some(20),
        "Queued send must run after every item enqueued before it"
    );
}

#[test]
fn test_send_moves_state_into_callback() {
    let ctx = ExecutionContext::new().unwrap();
    let result = Arc::new(Mutex::new(String::new()));

    let out = result.clone();
    ctx.send(
        move |mut text: String| {
            text.push_str(" world");
            *out.lock().unwrap() = text;
        },
        String::from("hello"),
    )
    .unwrap();

    assert_eq!(*result.lock().unwrap(), "hello world");
}

#[test]
fn test_send_after_stop_fails() {
    let ctx = ExecutionContext::new().unwrap();
    ctx.stop();

    let result = ctx.send(|_| panic!("must not run"), ());

    assert!(
        matches!(result, Err(Error::ContextClosed)),
        "Send after stop should fail with ContextClosed"
    );
}

#[test]
fn test_send_from_multiple_producers_is_fifo() {
    let ctx = ExecutionContext::new().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..3)
        .map(|producer| {
            let ctx = ctx.clone();
            let log = log.clone();
            thread::spawn(move || {
                for seq in 0..25 {
                    let log = log.clone();
                    ctx.send(move |entry| log.lock().unwrap().push(entry), (producer, seq))
                        .unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    let log = log.lock().unwrap().clone();
    assert_eq!(log.len(), 75, "Every send should run exactly once");

    // Any interleaving is valid, but each producer's own calls keep their order.
    let mut per_producer: HashMap<i32, Vec<i32>> = HashMap::new();
    for (producer, seq) in log {
        per_producer.entry(producer).or_default().push(seq);
    }
    for producer in 0..3 {
        assert_eq!(
            per_producer.get(&producer),
            Some(&(0..25).collect::<Vec<_>>()),
            "Producer {producer} observed out-of-order dispatch"
        );
    }
}

#[test]
fn test_posts_from_multiple_producers_follow_enqueue_order() {
    let ctx = ExecutionContext::new().unwrap();
    let enqueued = Arc::new(Mutex::new(Vec::new()));
    let dispatched = Arc::new(Mutex::new(Vec::new()));

    let producers: Vec<_> = (0..3)
        .map(|producer| {
            let ctx = ctx.clone();
            let enqueued = enqueued.clone();
            let dispatched = dispatched.clone();
            thread::spawn(move || {
                for seq in 0..200 {
                    let dispatched = dispatched.clone();
                    // Recording and posting under one lock fixes the global enqueue order.
                    let mut enqueued = enqueued.lock().unwrap();
                    ctx.post(
                        move |entry| dispatched.lock().unwrap().push(entry),
                        (producer, seq),
                    )
                    .unwrap();
                    enqueued.push((producer, seq));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    ctx.send(|_| {}, ()).unwrap();

    let enqueued = enqueued.lock().unwrap().clone();
    let dispatched = dispatched.lock().unwrap().clone();
    assert_eq!(enqueued.len(), 600);
    assert_eq!(
        dispatched, enqueued,
        "Dispatch order must equal the single global enqueue order"
    );
}

#[test]
fn test_callbacks_never_overlap() {
    let ctx = ExecutionContext::new().unwrap();
    let busy = Arc::new(AtomicBool::new(false));
    let overlapped = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let ctx = ctx.clone();
            let busy = busy.clone();
            let overlapped = overlapped.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    let busy = busy.clone();
                    let overlapped = overlapped.clone();
                    ctx.send(
                        move |_| {
                            if busy.swap(true, Ordering::SeqCst) {
                                overlapped.store(true, Ordering::SeqCst);
                            }
                            thread::sleep(Duration::from_millis(1));
                            busy.store(false, Ordering::SeqCst);
                        },
                        (),
                    )
                    .unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }

    assert!(
        !overlapped.load(Ordering::SeqCst),
        "Callbacks of one context must never run concurrently"
    );
}
