mod common;

use common::init_fake_clock;
use skein::{run_until_complete, sleep_for, spawn, when_all, when_any, yield_now};
use std::time::Duration;

#[test]
fn when_all2_preserves_argument_order() {
    let clock = init_fake_clock();
    let a = spawn(async { 42 });
    let b = spawn(async move {
        clock.advance(Duration::from_millis(5));
        yield_now().await;
        "Hello"
    });
    let (a, b) = run_until_complete(when_all!(a, b));
    assert_eq!(a.unwrap(), 42);
    assert_eq!(b.unwrap(), "Hello");
}

#[test]
fn when_all3_with_mixed_types_waits_for_the_slowest() {
    init_fake_clock();
    let task_int = spawn(async { 42 });
    let func_async = spawn(async {
        yield_now().await;
        yield_now().await;
    });
    let task_string = spawn(async { "Hello".to_string() });
    let (a, b, c) = run_until_complete(when_all!(task_int, func_async, task_string));
    assert_eq!(a.unwrap(), 42);
    assert_eq!(b.unwrap(), ());
    assert_eq!(c.unwrap(), "Hello");
}

#[test]
fn when_all_vec_collects_homogeneous_tasks_in_order() {
    init_fake_clock();
    let tasks = (0..5)
        .map(|i| {
            spawn(async move {
                for _ in 0..i {
                    yield_now().await;
                }
                i
            })
        })
        .collect();
    let results = run_until_complete(skein::when_all_vec(tasks));
    let values: Vec<_> = results.into_iter().map(|o| o.unwrap()).collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
}

#[test]
fn when_all_vec_over_zero_tasks_resolves_immediately() {
    init_fake_clock();
    let task: skein::Task<Vec<skein::Outcome<i32>>> = skein::when_all_vec(Vec::new());
    assert!(task.wait_for(Duration::ZERO).is_ready());
}

#[test]
fn when_all_macro_with_no_arguments_resolves_to_unit() {
    init_fake_clock();
    let task = when_all!();
    run_until_complete(task);
}

#[test]
fn when_any2_by_value_returns_the_first_to_finish_and_drops_the_rest() {
    init_fake_clock();
    let slow = spawn(async {
        sleep_for(Duration::from_secs(24 * 3600)).await;
        "slow"
    });
    let fast = spawn(async { "Good-bye" });

    let winner = run_until_complete(when_any!(slow, fast));
    match winner {
        skein::WhenAny2::First(_) => panic!("the slow task should not win"),
        skein::WhenAny2::Second(value) => assert_eq!(value.unwrap(), "Good-bye"),
    }
}

#[test]
fn when_any_ref_reports_the_winning_index_and_leaves_tasks_driveable() {
    init_fake_clock();
    let mut a = spawn(async {
        yield_now().await;
        yield_now().await;
        1
    });
    let mut b = spawn(async { 2 });

    let winner = run_until_complete(spawn(async move {
        let mut refs: Vec<&mut dyn skein::AnyReady> = vec![&mut a, &mut b];
        let index = skein::when_any_ref(&mut refs).await;
        (index, a, b)
    }));

    let (index, a, b) = winner;
    assert_eq!(index, 1);
    assert_eq!(run_until_complete(a), 1);
    assert_eq!(b.get(), 2);
}
