use ge_kernel::sync::{Priority, PriorityMutex};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc, Barrier, Mutex,
    },
    thread,
    time::Duration,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Blocks until `count` high-priority acquirers are waiting on the mutex.
fn wait_for_high_waiters(mutex: &PriorityMutex, count: usize) {
    while mutex.waiting_high_priority() != count {
        thread::sleep(Duration::from_millis(1));
    }
}

/// Blocks until `count` low-priority acquirers are waiting on the mutex.
fn wait_for_low_waiters(mutex: &PriorityMutex, count: usize) {
    while mutex.waiting_low_priority() != count {
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn mutual_exclusion() {
    init_logger();
    let mutex = Arc::new(PriorityMutex::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    (0..8)
        .map(|i| {
            let (mutex, inside, max_inside) = (mutex.clone(), inside.clone(), max_inside.clone());
            let priority = if i % 3 == 0 { Priority::High } else { Priority::Low };
            thread::spawn(move || {
                (0..200).for_each(|_| {
                    let _guard = mutex.lock(priority);
                    let now = inside.fetch_add(1, SeqCst) + 1;
                    max_inside.fetch_max(now, SeqCst);
                    thread::yield_now();
                    inside.fetch_sub(1, SeqCst);
                })
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .for_each(|t| t.join().unwrap());

    assert_eq!(max_inside.load(SeqCst), 1);
    assert!(!mutex.is_locked());
}

#[test]
fn high_priority_overtakes_queued_low_priority() {
    init_logger();
    for queued in [0, 1, 10] {
        let mutex = Arc::new(PriorityMutex::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        mutex.acquire_low_priority();

        let low = (0..queued)
            .map(|_| {
                let (mutex, order) = (mutex.clone(), order.clone());
                thread::spawn(move || {
                    let guard = mutex.lock_low();
                    order.lock().unwrap().push(guard.priority());
                })
            })
            .collect::<Vec<_>>();
        wait_for_low_waiters(&mutex, queued);

        let high = {
            let (mutex, order) = (mutex.clone(), order.clone());
            thread::spawn(move || {
                let guard = mutex.lock_high();
                order.lock().unwrap().push(guard.priority());
            })
        };
        wait_for_high_waiters(&mutex, 1);

        mutex.release_low_priority();
        high.join().unwrap();
        low.into_iter().for_each(|t| t.join().unwrap());

        let order = order.lock().unwrap();
        assert_eq!(order.len(), queued + 1);
        assert_eq!(order[0], Priority::High, "{} queued low-priority threads", queued);
    }
}

#[test]
fn sequential_low_priority_pairs_complete() {
    let mutex = Arc::new(PriorityMutex::new());
    let completed = Arc::new(AtomicUsize::new(0));

    (0..2).for_each(|_| {
        let (mutex, completed) = (mutex.clone(), completed.clone());
        thread::spawn(move || {
            mutex.acquire_low_priority();
            completed.fetch_add(1, SeqCst);
            mutex.release_low_priority();
        })
        .join()
        .unwrap()
    });

    assert_eq!(completed.load(SeqCst), 2);
    assert!(!mutex.is_locked());
}

#[test]
fn uncontended_high_priority_cycle() {
    let mutex = PriorityMutex::new();
    mutex.acquire_high_priority();
    assert_eq!(mutex.holder(), Some(Priority::High));
    mutex.release_high_priority();
    assert_eq!(mutex.holder(), None);

    // The conventional release leaves the mutex free for another cycle
    mutex.acquire_high_priority();
    mutex.release_high_priority();
    assert!(mutex.try_lock_low().is_some());
}

#[test]
fn low_priority_waits_for_high_priority_release() {
    #[derive(Debug, PartialEq)]
    enum Event {
        HighStart,
        HighEnd,
        LowStart,
    }

    let mutex = Arc::new(PriorityMutex::new());
    let events = Arc::new(Mutex::new(Vec::new()));

    mutex.acquire_high_priority();
    events.lock().unwrap().push(Event::HighStart);

    let low = {
        let (mutex, events) = (mutex.clone(), events.clone());
        thread::spawn(move || {
            mutex.acquire_low_priority();
            events.lock().unwrap().push(Event::LowStart);
            mutex.release_low_priority();
        })
    };

    thread::sleep(Duration::from_millis(10));
    events.lock().unwrap().push(Event::HighEnd);
    mutex.release_high_priority();

    low.join().unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        vec![Event::HighStart, Event::HighEnd, Event::LowStart]
    );
}

#[test]
fn simultaneous_start_serves_high_priority_early() {
    const LOW_THREADS: usize = 5;

    for _ in 0..100 {
        let mutex = Arc::new(PriorityMutex::new());
        let barrier = Arc::new(Barrier::new(LOW_THREADS + 1));
        let order = Arc::new(Mutex::new(Vec::new()));

        let threads = (0..=LOW_THREADS)
            .map(|i| {
                let priority = if i == 0 { Priority::High } else { Priority::Low };
                let (mutex, barrier, order) = (mutex.clone(), barrier.clone(), order.clone());
                thread::spawn(move || {
                    barrier.wait();
                    let _guard = mutex.lock(priority);
                    order.lock().unwrap().push(priority);
                    thread::sleep(Duration::from_millis(5));
                })
            })
            .collect::<Vec<_>>();
        threads.into_iter().for_each(|t| t.join().unwrap());

        let order = order.lock().unwrap();
        let high_position = order.iter().position(|p| *p == Priority::High).unwrap();
        assert!(high_position <= 1, "served in order {:?}", order);
    }
}

#[test]
fn try_lock_low_refuses_while_high_priority_waits() {
    let mutex = Arc::new(PriorityMutex::new());
    let guard = mutex.lock_low();

    let high = {
        let mutex = mutex.clone();
        thread::spawn(move || drop(mutex.lock_high()))
    };
    wait_for_high_waiters(&mutex, 1);

    drop(guard);
    high.join().unwrap();
    assert!(mutex.try_lock_low().is_some());

    let _guard = mutex.lock_low();
    assert!(mutex.try_lock_high().is_none());
    assert!(mutex.try_lock_low().is_none());
}

#[test]
fn timed_out_high_priority_unblocks_low_priority() {
    let mutex = Arc::new(PriorityMutex::new());
    let holder = mutex.lock_low();

    let low = {
        let mutex = mutex.clone();
        thread::spawn(move || {
            let guard = mutex.lock_low();
            guard.priority()
        })
    };
    wait_for_low_waiters(&mutex, 1);

    assert!(mutex.try_lock_high_for(Duration::from_millis(20)).is_none());
    assert_eq!(mutex.waiting_high_priority(), 0);

    drop(holder);
    assert_eq!(low.join().unwrap(), Priority::Low);
}

#[test]
fn timed_lock_succeeds_once_released() {
    let mutex = Arc::new(PriorityMutex::new());
    let holder = mutex.lock_high();

    let waiter = {
        let mutex = mutex.clone();
        thread::spawn(move || {
            mutex
                .try_lock_low_for(Duration::from_secs(5))
                .map(|guard| guard.priority())
        })
    };

    wait_for_low_waiters(&mutex, 1);
    drop(holder);
    assert_eq!(waiter.join().unwrap(), Some(Priority::Low));
    assert_eq!(mutex.waiting_low_priority(), 0);
}

#[test]
fn waiting_counts_track_blocked_acquirers() {
    let mutex = Arc::new(PriorityMutex::new());
    let holder = mutex.lock_high();
    assert_eq!(mutex.waiting_low_priority(), 0);

    let low = (0..3)
        .map(|_| {
            let mutex = mutex.clone();
            thread::spawn(move || drop(mutex.lock_low()))
        })
        .collect::<Vec<_>>();
    wait_for_low_waiters(&mutex, 3);
    assert_eq!(mutex.waiting_high_priority(), 0);

    // A timed-out waiter leaves the queue
    assert!(mutex.try_lock_low_for(Duration::from_millis(5)).is_none());
    assert_eq!(mutex.waiting_low_priority(), 3);

    drop(holder);
    low.into_iter().for_each(|t| t.join().unwrap());
    assert_eq!(mutex.waiting_low_priority(), 0);
    assert!(!mutex.is_locked());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic]
fn release_with_wrong_priority_panics_in_debug() {
    let mutex = PriorityMutex::new();
    mutex.acquire_low_priority();
    mutex.release_high_priority();
}
