/*!
 * Multi-Object Wait Integration Tests
 *
 * AnyOne/ExactAll resolution, interruption, teardown and list validation
 */

use multiwait::{
    Event, MatchCondition, Mutex, Semaphore, SyncConfig, SyncObject, Timer, WaitError,
    WaitOutcome, WaitRegistry, WaitSessionId, Waitable,
};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LONG: Option<Duration> = Some(Duration::from_secs(5));

// ============================================================================
// ExactAll
// ============================================================================

#[test]
#[serial]
fn test_all_requires_simultaneous_signal() {
    let registry = WaitRegistry::with_defaults();
    let a = Event::auto(&registry);
    let b = Event::auto(&registry);

    let handle = {
        let (registry, a, b) = (registry.clone(), a.clone(), b.clone());
        thread::spawn(move || {
            registry.wait_for_multiple(&[&*a, &*b], MatchCondition::ExactAll, LONG)
        })
    };

    thread::sleep(Duration::from_millis(50));
    a.set();
    a.reset();
    b.set();
    thread::sleep(Duration::from_millis(50));
    assert!(!handle.is_finished());

    a.set();
    assert_eq!(handle.join().unwrap().unwrap(), WaitOutcome::All);
    // Both auto-reset events were consumed by the single claim
    assert!(!a.is_set());
    assert!(!b.is_set());
}

#[test]
#[serial]
fn test_all_leaves_no_partial_claim() {
    let registry = WaitRegistry::with_defaults();
    let mutex = Mutex::new(&registry);
    let sem = Semaphore::new(&registry, 1, 1).unwrap();
    assert!(mutex.try_lock());

    let handle = {
        let (registry, mutex, sem) = (registry.clone(), mutex.clone(), sem.clone());
        thread::spawn(move || {
            let first = registry.wait_for_multiple(
                &[&*mutex, &*sem],
                MatchCondition::ExactAll,
                Some(Duration::from_millis(100)),
            );
            let second = registry.wait_for_multiple(&[&*mutex, &*sem], MatchCondition::ExactAll, LONG);
            let owned = mutex.owner() == Some(thread::current().id());
            assert!(mutex.unlock());
            (first.unwrap(), second.unwrap(), owned)
        })
    };

    thread::sleep(Duration::from_millis(30));
    assert_eq!(sem.count(), 1);
    thread::sleep(Duration::from_millis(150));
    assert_eq!(sem.count(), 1);
    assert!(mutex.unlock());

    let (first, second, owned) = handle.join().unwrap();
    assert_eq!(first, WaitOutcome::Timeout);
    assert_eq!(second, WaitOutcome::All);
    assert!(owned);
    assert_eq!(sem.count(), 0);
    assert!(!mutex.is_locked());
}

#[test]
fn test_all_with_owned_mutex_recurses() {
    let registry = WaitRegistry::with_defaults();
    let mutex = Mutex::new(&registry);
    let ready = Event::new(&registry, true, true);
    assert!(mutex.try_lock());

    let outcome = registry
        .wait_for_multiple(&[&*mutex, &*ready], MatchCondition::ExactAll, Some(Duration::ZERO))
        .unwrap();

    assert_eq!(outcome, WaitOutcome::All);
    assert_eq!(mutex.recursion(), 2);
    assert!(mutex.unlock());
    assert!(mutex.unlock());
    assert!(!mutex.is_locked());
}

#[test]
fn test_all_poll_with_unsignaled_member() {
    let registry = WaitRegistry::with_defaults();
    let sem = Semaphore::new(&registry, 1, 1).unwrap();
    let event = Event::manual(&registry);

    let outcome = registry
        .wait_for_multiple(&[&*sem, &*event], MatchCondition::ExactAll, Some(Duration::ZERO))
        .unwrap();

    assert_eq!(outcome, WaitOutcome::Timeout);
    assert_eq!(sem.count(), 1);
    assert_eq!(registry.active_sessions(), 0);
}

// ============================================================================
// Interruption
// ============================================================================

#[test]
#[serial]
fn test_interrupt_session() {
    let registry = WaitRegistry::with_defaults();
    let event = Event::manual(&registry);
    let (tx, rx) = mpsc::channel();

    let handle = {
        let event = event.clone();
        thread::spawn(move || {
            tx.send(WaitSessionId::current()).unwrap();
            event.wait(LONG)
        })
    };

    let session = rx.recv().unwrap();
    // The session is only published once the thread blocks
    while !registry.interrupt(session) {
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(handle.join().unwrap().unwrap(), WaitOutcome::AsyncSignal);
    assert!(!registry.interrupt(session));
    assert_eq!(registry.stats().interrupts, 1);
    assert!(!event.is_set());
}

#[test]
#[serial]
fn test_timer_interrupts_waiting_session() {
    let registry = WaitRegistry::with_defaults();
    let event = Event::manual(&registry);
    let watchdog = Timer::new(&registry, true).unwrap();

    watchdog
        .set_interrupting(Duration::from_millis(50), None, WaitSessionId::current())
        .unwrap();
    let outcome = event.wait(LONG).unwrap();

    assert_eq!(outcome, WaitOutcome::AsyncSignal);
    assert_eq!(watchdog.fire_count(), 1);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
#[serial]
fn test_close_wakes_every_waiter() {
    let registry = WaitRegistry::with_defaults();
    let event = Event::manual(&registry);

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let event = event.clone();
            thread::spawn(move || event.wait(LONG))
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(event.close(), 3);

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), WaitOutcome::Interrupted(0));
    }
    assert!(event.is_closed());
    assert_eq!(registry.stats().teardown_wakes, 3);
    assert!(matches!(event.wait(LONG), Err(WaitError::InvalidIndex(0))));
}

#[test]
fn test_lenient_registry_skips_closed_entry() {
    let registry = WaitRegistry::new(SyncConfig::lenient()).unwrap();
    let closed = Event::manual(&registry);
    let open = Event::new(&registry, true, true);
    assert_eq!(closed.close(), 0);

    let outcome = registry
        .wait_for_multiple(&[&*closed, &*open], MatchCondition::AnyOne, Some(Duration::ZERO))
        .unwrap();
    assert_eq!(outcome, WaitOutcome::Index(1));

    let outcome = registry
        .wait_for_multiple(&[&*closed, &*open], MatchCondition::ExactAll, Some(Duration::ZERO))
        .unwrap();
    assert_eq!(outcome, WaitOutcome::All);

    assert!(matches!(
        closed.wait(Some(Duration::ZERO)),
        Err(WaitError::InvalidIndex(0))
    ));
}

#[test]
#[serial]
fn test_close_interrupts_all_wait_with_member_index() {
    let registry = WaitRegistry::with_defaults();
    let a = Event::manual(&registry);
    let b = Semaphore::new(&registry, 0, 1).unwrap();

    let handle = {
        let (registry, a, b) = (registry.clone(), a.clone(), b.clone());
        thread::spawn(move || {
            registry.wait_for_multiple(&[&*a, &*b], MatchCondition::ExactAll, LONG)
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(b.close(), 1);
    assert_eq!(handle.join().unwrap().unwrap(), WaitOutcome::Interrupted(1));
    assert_eq!(registry.waiter_count(a.id()), 0);
}

#[test]
#[serial]
fn test_fail_keeps_object_usable() {
    let registry = WaitRegistry::with_defaults();
    let event = Event::manual(&registry);

    let handle = {
        let event = event.clone();
        thread::spawn(move || event.wait(LONG))
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(registry.fail(&*event), 1);
    assert_eq!(handle.join().unwrap().unwrap(), WaitOutcome::Interrupted(0));

    event.set();
    assert_eq!(event.wait(Some(Duration::ZERO)).unwrap(), WaitOutcome::Index(0));
}

// ============================================================================
// Timeouts
// ============================================================================

#[test]
#[serial]
fn test_multiple_timeout_accuracy() {
    let registry = WaitRegistry::with_defaults();
    let a = Event::manual(&registry);
    let b = Semaphore::new(&registry, 0, 4).unwrap();
    let timeout = Duration::from_millis(100);

    let start = Instant::now();
    let outcome = registry
        .wait_for_multiple(&[&*a, &*b], MatchCondition::AnyOne, Some(timeout))
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome, WaitOutcome::Timeout);
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_millis(150), "overshot: {elapsed:?}");
    assert_eq!(registry.waiter_count(a.id()), 0);
    assert_eq!(registry.waiter_count(b.id()), 0);
    assert_eq!(registry.active_sessions(), 0);
}

#[test]
#[serial]
fn test_default_timeout_from_config() {
    let config = SyncConfig::default().with_default_timeout(Duration::from_millis(30));
    let registry = WaitRegistry::new(config).unwrap();
    let event = Event::manual(&registry);

    let start = Instant::now();
    assert_eq!(event.wait_default().unwrap(), WaitOutcome::Timeout);
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
#[serial]
fn test_any_wakes_on_later_signal() {
    let registry = WaitRegistry::with_defaults();
    let shutdown = Event::manual(&registry);
    let inbound = Semaphore::new(&registry, 0, 8).unwrap();

    let handle = {
        let (registry, shutdown, inbound) = (registry.clone(), shutdown.clone(), inbound.clone());
        thread::spawn(move || {
            registry.wait_for_multiple(&[&*shutdown, &*inbound], MatchCondition::AnyOne, LONG)
        })
    };

    thread::sleep(Duration::from_millis(50));
    inbound.release(1);

    assert_eq!(handle.join().unwrap().unwrap(), WaitOutcome::Index(1));
    assert_eq!(inbound.count(), 0);
    assert!(registry.stats().blocked >= 1);
    assert_eq!(registry.active_sessions(), 0);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_empty_list_rejected() {
    let registry = WaitRegistry::with_defaults();
    let result = registry.wait_for_multiple(&[], MatchCondition::AnyOne, Some(Duration::ZERO));
    assert!(matches!(result, Err(WaitError::NoObjects)));
}

#[test]
fn test_too_many_objects_rejected() {
    let registry = WaitRegistry::with_defaults();
    let events: Vec<Arc<Event>> = (0..65).map(|_| Event::manual(&registry)).collect();
    let list: Vec<&dyn Waitable> = events.iter().map(|e| &**e as &dyn Waitable).collect();

    let result = registry.wait_for_multiple(&list, MatchCondition::AnyOne, Some(Duration::ZERO));
    assert!(matches!(
        result,
        Err(WaitError::TooManyObjects { count: 65, max: 64 })
    ));
    assert_eq!(registry.waiter_count(events[0].id()), 0);
}

#[test]
fn test_configured_object_limit() {
    let registry = WaitRegistry::new(SyncConfig::default().with_max_objects(2)).unwrap();
    let events: Vec<Arc<Event>> = (0..3).map(|_| Event::manual(&registry)).collect();
    let list: Vec<&dyn Waitable> = events.iter().map(|e| &**e as &dyn Waitable).collect();

    let result = registry.wait_for_multiple(&list, MatchCondition::ExactAll, Some(Duration::ZERO));
    assert!(matches!(
        result,
        Err(WaitError::TooManyObjects { count: 3, max: 2 })
    ));
}

#[test]
fn test_duplicate_entry() {
    let strict = WaitRegistry::with_defaults();
    let event = Event::new(&strict, true, true);
    let result = strict.wait_for_multiple(&[&*event, &*event], MatchCondition::AnyOne, None);
    assert!(matches!(result, Err(WaitError::InvalidIndex(1))));

    let lenient = WaitRegistry::new(SyncConfig::lenient()).unwrap();
    let event = Event::new(&lenient, true, true);
    let outcome = lenient
        .wait_for_multiple(&[&*event, &*event], MatchCondition::AnyOne, None)
        .unwrap();
    assert_eq!(outcome, WaitOutcome::Index(0));
}

#[test]
fn test_foreign_registry_entry() {
    let registry = WaitRegistry::with_defaults();
    let other = WaitRegistry::with_defaults();
    let local = Event::new(&registry, true, true);
    let foreign = Event::new(&other, true, true);

    let result = registry.wait_for_multiple(
        &[&*local, &*foreign],
        MatchCondition::AnyOne,
        Some(Duration::ZERO),
    );
    assert!(matches!(result, Err(WaitError::InvalidIndex(1))));
    assert!(matches!(
        registry.wait_for_single(&*foreign, Some(Duration::ZERO)),
        Err(WaitError::InvalidIndex(0))
    ));
}

#[test]
fn test_stats_track_fast_path() {
    let registry = WaitRegistry::with_defaults();
    let sem = Semaphore::new(&registry, 2, 2).unwrap();

    assert!(sem.try_acquire());
    assert!(sem.try_acquire());
    assert!(!sem.try_acquire());

    let stats = registry.stats();
    assert_eq!(stats.waits, 3);
    assert_eq!(stats.fast_path, 2);
    assert_eq!(stats.blocked, 0);
    assert_eq!(stats.timeouts, 1);
}
