//! Checks that restructuring preserves externally observable behaviour
//! (spec §8): a fast-path self loop and a diamond branch, neither of which
//! needs any synthetic control variables once restructured, plus an
//! asymmetric branch whose degenerate slot needs a `SyntheticFill` and
//! whose tail needs header unification via a `SyntheticHead` — the
//! scenario that exercises the fill-to-tail-head wiring most directly.
//! Each trace was hand-verified against the reference simulator, which
//! interprets the synthetic control variables directly, so a match, block
//! for block, confirms restructuring didn't change what runs.

mod support;

use support::{build, simulator};

#[test]
fn simple_loop_trace_is_unchanged_by_restructuring() {
    let before = build(&[(0, &[1]), (1, &[1, 2]), (2, &[])]);
    let mut after = before.clone();
    after.restructure().unwrap();

    let choices = [0, 1];
    assert_eq!(
        simulator::run(&before, &choices),
        simulator::run(&after, &choices)
    );
}

#[test]
fn diamond_branch_trace_is_unchanged_by_restructuring() {
    let before = build(&[(0, &[1, 2]), (1, &[3]), (2, &[3]), (3, &[])]);
    let mut after = before.clone();
    after.restructure().unwrap();

    for choice in [0usize, 1] {
        assert_eq!(
            simulator::run(&before, &[choice]),
            simulator::run(&after, &[choice]),
            "choice {choice} should produce the same trace"
        );
    }
}

#[test]
fn asymmetric_branch_tails_trace_is_unchanged_by_restructuring() {
    let before = build(&[(0, &[1, 4]), (1, &[2, 3]), (2, &[4]), (3, &[4]), (4, &[])]);
    let mut after = before.clone();
    after.restructure().unwrap();

    for choices in [[0usize, 0], [0, 1], [1, 0]] {
        assert_eq!(
            simulator::run(&before, &choices),
            simulator::run(&after, &choices),
            "choices {choices:?} should produce the same trace"
        );
    }
}
