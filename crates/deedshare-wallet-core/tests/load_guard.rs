use deedshare_wallet_core::{GuardOutcome, LoadGuard, SkipReason};

#[test]
fn overlapping_calls_run_exactly_one_load() {
    let guard = LoadGuard::new();
    let outer = guard
        .run("portfolio", 0, 1_000, || {
            let inner = guard
                .run("portfolio", 0, 1_000, || Ok::<_, ()>(1))
                .expect("inner guard call");
            assert_eq!(inner, GuardOutcome::Skipped(SkipReason::InFlight));
            Ok::<_, ()>(2)
        })
        .expect("outer guard call");
    assert_eq!(outer, GuardOutcome::Completed(2));
}

#[test]
fn distinct_keys_do_not_contend() {
    let guard = LoadGuard::new();
    let outer = guard
        .run("a", 0, 1_000, || {
            guard
                .run("b", 0, 1_000, || Ok::<_, ()>(10))
                .expect("inner guard call")
                .completed()
                .ok_or(())
        })
        .expect("outer guard call");
    assert_eq!(outer, GuardOutcome::Completed(10));
}

#[test]
fn second_call_within_min_interval_is_throttled() {
    let guard = LoadGuard::new();
    let first = guard
        .run("portfolio", 3_000, 1_000, || Ok::<_, ()>(1))
        .expect("first");
    assert_eq!(first, GuardOutcome::Completed(1));

    let second = guard
        .run("portfolio", 3_000, 1_500, || Ok::<_, ()>(2))
        .expect("second");
    assert_eq!(second, GuardOutcome::Skipped(SkipReason::Throttled));

    let third = guard
        .run("portfolio", 3_000, 4_001, || Ok::<_, ()>(3))
        .expect("third");
    assert_eq!(third, GuardOutcome::Completed(3));
}

#[test]
fn guard_releases_after_a_failed_load() {
    let guard = LoadGuard::new();
    let failed: Result<GuardOutcome<u32>, &str> = guard.run("portfolio", 0, 1_000, || Err("boom"));
    assert_eq!(failed, Err("boom"));

    // The in-flight flag must not survive the failure.
    let retry = guard
        .run("portfolio", 0, 1_000, || Ok::<_, &str>(7))
        .expect("retry after failure");
    assert_eq!(retry, GuardOutcome::Completed(7));
}

#[test]
fn failure_still_starts_the_throttle_window() {
    let guard = LoadGuard::new();
    let _: Result<GuardOutcome<u32>, &str> = guard.run("portfolio", 3_000, 1_000, || Err("boom"));
    let second = guard
        .run("portfolio", 3_000, 1_100, || Ok::<_, &str>(1))
        .expect("second");
    assert_eq!(second, GuardOutcome::Skipped(SkipReason::Throttled));
}

#[test]
fn invalidation_mid_flight_discards_the_result() {
    let guard = LoadGuard::new();
    let outcome = guard
        .run("portfolio", 0, 1_000, || {
            // Consumer tears down while the load is still running.
            guard.invalidate("portfolio");
            Ok::<_, ()>(42)
        })
        .expect("guarded load");
    assert_eq!(outcome, GuardOutcome::Skipped(SkipReason::Abandoned));

    // No dangling in-flight flag afterwards.
    let next = guard
        .run("portfolio", 0, 1_001, || Ok::<_, ()>(43))
        .expect("next load");
    assert_eq!(next, GuardOutcome::Completed(43));
}

#[test]
fn invalidate_all_clears_the_throttle_window() {
    let guard = LoadGuard::new();
    let _ = guard
        .run("portfolio", 60_000, 1_000, || Ok::<_, ()>(1))
        .expect("first");
    guard.invalidate_all();
    let second = guard
        .run("portfolio", 60_000, 1_001, || Ok::<_, ()>(2))
        .expect("second");
    assert_eq!(second, GuardOutcome::Completed(2));
}
