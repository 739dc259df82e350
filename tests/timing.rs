mod common;

use common::init_fake_clock;
use skein::{run_until_complete, sleep_for, spawn, yield_now, Clock, WaitOutcome};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn sleep_monotonicity_a_task_is_never_resumed_before_its_wake_time() {
    let clock = init_fake_clock();
    let log = Rc::new(RefCell::new(Vec::new()));

    let sleeper = {
        let log = log.clone();
        let clock = clock.clone();
        spawn(async move {
            sleep_for(Duration::from_millis(100)).await;
            log.borrow_mut().push(clock.now());
        })
    };

    // Advancing short of the wake time must not resume the sleeper.
    skein::run_for(Duration::from_millis(50));
    assert!(log.borrow().is_empty());
    assert!(!sleeper.is_ready());

    // Advancing past it must.
    let outcome = sleeper.wait_for(Duration::from_millis(100));
    assert_eq!(outcome, WaitOutcome::Ready);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn yield_idempotence_k_yields_take_exactly_k_plus_one_resumes() {
    init_fake_clock();
    for k in 0..5u32 {
        let resumes = Rc::new(RefCell::new(0u32));
        let counter = resumes.clone();
        let task = spawn(async move {
            *counter.borrow_mut() += 1;
            for _ in 0..k {
                yield_now().await;
                *counter.borrow_mut() += 1;
            }
        });
        run_until_complete(task);
        assert_eq!(*resumes.borrow(), k + 1);
    }
}

#[test]
fn destruction_mid_sleep_is_never_resumed_again() {
    let clock = init_fake_clock();
    let resumed = Rc::new(RefCell::new(false));
    let flag = resumed.clone();
    let task = spawn(async move {
        sleep_for(Duration::from_secs(10)).await;
        *flag.borrow_mut() = true;
    });

    // Let it register its sleep, then destroy it almost immediately.
    skein::run_for(Duration::from_millis(0));
    clock.advance(Duration::from_millis(1));
    task.destroy();

    clock.advance(Duration::from_secs(20));
    skein::run_for(Duration::from_secs(20));
    assert!(!*resumed.borrow(), "a destroyed task must never resume");
}

#[test]
fn interleaved_counters_scenario() {
    init_fake_clock();
    let trace = Rc::new(RefCell::new(Vec::<String>::new()));

    fn counter(id: u32, trace: Rc<RefCell<Vec<String>>>) -> skein::Task<()> {
        spawn(async move {
            trace.borrow_mut().push(format!("begin({})", id));
            yield_now().await;
            for i in 1..=3 {
                trace.borrow_mut().push(format!("{}({})", i, id));
                sleep_for(Duration::from_millis(100)).await;
            }
            trace.borrow_mut().push(format!("end({})", id));
        })
    }

    let t1 = counter(1, trace.clone());
    let t2 = counter(2, trace.clone());
    let t3 = counter(3, trace.clone());

    // Spawning alone shouldn't run anything yet.
    assert!(trace.borrow().is_empty());

    t1.wait_for(Duration::from_millis(150));
    t2.wait();

    assert!(!t3.is_ready());
    assert_eq!(
        *trace.borrow(),
        vec![
            "begin(1)", "begin(2)", "begin(3)", "1(1)", "1(2)", "1(3)", "2(1)", "2(2)", "2(3)",
            "3(1)", "3(2)", "3(3)", "end(1)", "end(2)",
        ]
    );
}
