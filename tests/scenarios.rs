//! The six concrete restructuring scenarios (spec §8), checked structurally.

mod support;

use scfg_restructure::{Block, Kind, Name, RegionKind};
use support::{basic, build, regions};

#[test]
fn simple_loop_declares_its_own_backedge() {
    let mut scfg = build(&[(0, &[1]), (1, &[1, 2]), (2, &[])]);
    scfg.restructure().unwrap();

    let region_names = regions(&scfg);
    assert_eq!(region_names.len(), 1, "exactly one region at the top level");
    let region = scfg.get(&region_names[0]).unwrap().as_region().unwrap();
    assert_eq!(region.kind, RegionKind::Loop);
    assert_eq!(region.header, Some(basic(1)));
    assert_eq!(region.base.jump_targets.as_slice(), &[basic(2)]);

    // No synthetic scaffolding: the loop body is exactly the original
    // self-looping block, now carrying a declared backedge to itself.
    assert_eq!(region.subregion.len(), 1);
    let looped = region.subregion.get(&basic(1)).unwrap();
    assert_eq!(looped.backedges(), &[basic(1)]);
    assert_eq!(looped.jump_targets(), &[basic(1), basic(2)]);
}

#[test]
fn for_loop_pattern_gets_an_exiting_latch() {
    let mut scfg = build(&[(0, &[1]), (1, &[2, 3]), (2, &[1]), (3, &[])]);
    scfg.restructure().unwrap();

    let region_names = regions(&scfg);
    assert_eq!(region_names.len(), 1);
    let region = scfg.get(&region_names[0]).unwrap().as_region().unwrap();
    assert_eq!(region.kind, RegionKind::Loop);
    assert_eq!(region.base.jump_targets.as_slice(), &[basic(3)]);

    assert!(region.subregion.contains(&basic(1)));
    assert!(region.subregion.contains(&basic(2)));

    let latches: Vec<Name> = region
        .subregion
        .sorted_names()
        .into_iter()
        .filter(|n| n.kind() == Kind::SynthExitLatch)
        .collect();
    assert_eq!(latches.len(), 1, "exactly one exiting latch");
    let latch = region.subregion.get(&latches[0]).unwrap();
    assert_eq!(latch.backedges(), &[basic(1)]);
    let mut targets = latch.jump_targets().to_vec();
    targets.sort();
    assert_eq!(targets, vec![basic(1), basic(3)]);
}

/// Finds the unique [`RegionKind::Loop`] region anywhere in the hierarchy.
/// Two headers means the restructured entry point is itself a 2-way
/// branch, so branch restructuring runs afterwards and may nest the loop
/// a level or two deeper than the top of the graph.
fn find_loop_region(scfg: &scfg_restructure::Scfg) -> &scfg_restructure::RegionBlock {
    for name in scfg.sorted_names() {
        if let Some(r) = scfg.get(&name).and_then(Block::as_region) {
            if r.kind == RegionKind::Loop {
                return r;
            }
            if let Some(found) = try_find_loop_region(&r.subregion) {
                return found;
            }
        }
    }
    panic!("no loop region found");
}

fn try_find_loop_region(scfg: &scfg_restructure::Scfg) -> Option<&scfg_restructure::RegionBlock> {
    for name in scfg.sorted_names() {
        if let Some(r) = scfg.get(&name).and_then(Block::as_region) {
            if r.kind == RegionKind::Loop {
                return Some(r);
            }
            if let Some(found) = try_find_loop_region(&r.subregion) {
                return Some(found);
            }
        }
    }
    None
}

#[test]
fn irreducible_two_header_loop_gets_a_synthetic_head() {
    let mut scfg = build(&[
        (0, &[1, 2]),
        (1, &[3]),
        (2, &[4]),
        (3, &[2, 5]),
        (4, &[1]),
        (5, &[]),
    ]);
    scfg.restructure().unwrap();

    let region = find_loop_region(&scfg);
    assert_eq!(region.base.jump_targets.as_slice(), &[basic(5)]);
    assert_eq!(region.header.map(|h| h.kind()), Some(Kind::SynthHead));

    for member in [1, 2, 3, 4] {
        assert!(
            region.subregion.contains(&basic(member)),
            "loop body should still contain block {member}"
        );
    }
    let latches: Vec<Name> = region
        .subregion
        .sorted_names()
        .into_iter()
        .filter(|n| n.kind() == Kind::SynthExitLatch)
        .collect();
    assert_eq!(latches.len(), 1);
}

#[test]
fn diamond_branch_produces_head_two_branches_and_a_tail() {
    let mut scfg = build(&[(0, &[1, 2]), (1, &[3]), (2, &[3]), (3, &[])]);
    scfg.restructure().unwrap();

    let region_names = regions(&scfg);
    assert_eq!(
        region_names.len(),
        4,
        "head, two branch bodies and a shared tail end up as four sibling regions"
    );

    let kinds: Vec<RegionKind> = region_names
        .iter()
        .map(|n| scfg.get(n).unwrap().as_region().unwrap().kind)
        .collect();
    assert_eq!(kinds.iter().filter(|k| **k == RegionKind::Head).count(), 1);
    assert_eq!(kinds.iter().filter(|k| **k == RegionKind::Branch).count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == RegionKind::Tail).count(), 1);

    let head = region_names
        .iter()
        .find(|n| scfg.get(n).unwrap().as_region().unwrap().kind == RegionKind::Head)
        .unwrap();
    let head_region = scfg.get(head).unwrap().as_region().unwrap();
    assert_eq!(head_region.subregion.len(), 1);
    assert!(head_region.subregion.contains(&basic(0)));
    assert_eq!(head_region.base.jump_targets.len(), 2);

    for n in &region_names {
        let r = scfg.get(n).unwrap().as_region().unwrap();
        if r.kind == RegionKind::Branch {
            assert_eq!(r.subregion.len(), 1);
        }
    }
}

/// Finds a block of the given [`Kind`] anywhere in the hierarchy, recursing
/// through every region's subregion.
fn find_block_recursive(scfg: &scfg_restructure::Scfg, kind: Kind) -> Option<Name> {
    for name in scfg.sorted_names() {
        if name.kind() == kind {
            return Some(name);
        }
        if let Some(r) = scfg.get(&name).and_then(Block::as_region) {
            if let Some(found) = find_block_recursive(&r.subregion, kind) {
                return Some(found);
            }
        }
    }
    None
}

/// True if `name` is a direct member of some region's subregion anywhere in
/// the hierarchy (i.e. properly enclosed, not a top-level orphan).
fn is_enclosed_in_some_region(scfg: &scfg_restructure::Scfg, name: Name) -> bool {
    for candidate in scfg.sorted_names() {
        if let Some(r) = scfg.get(&candidate).and_then(Block::as_region) {
            if r.subregion.contains(&name) {
                return true;
            }
            if is_enclosed_in_some_region(&r.subregion, name) {
                return true;
            }
        }
    }
    false
}

#[test]
fn asymmetric_branch_tails_get_a_synthetic_fill_and_tail() {
    // `0`'s second target (`4`) is the convergence point itself, with no
    // body of its own, so that slot needs a `SyntheticFill`. `0`'s first
    // target (`1`) has two blocks (`2`, `3`) that both exit the branch
    // body, so its tail needs multiplexing via a `SyntheticTail`.
    let mut scfg = build(&[(0, &[1, 4]), (1, &[2, 3]), (2, &[4]), (3, &[4]), (4, &[])]);
    scfg.restructure().unwrap();

    // The fill sits on the edge between `begin` and the tail's header, so
    // it must end up enclosed inside some region (the tail region, in this
    // shape) rather than left as a top-level orphan outside the hierarchy.
    let fill = find_block_recursive(&scfg, Kind::SynthFill).expect("a SyntheticFill should exist");
    assert!(
        is_enclosed_in_some_region(&scfg, fill),
        "the SyntheticFill must be enclosed in a region, not left as a top-level orphan"
    );

    let region_names = regions(&scfg);
    assert_eq!(
        region_names
            .iter()
            .filter(|n| scfg.get(n).unwrap().as_region().unwrap().kind == RegionKind::Branch)
            .count(),
        1,
        "only the real (non-degenerate) target gets a branch body"
    );

    let has_tail = region_names.iter().any(|n| {
        let r = scfg.get(n).unwrap().as_region().unwrap();
        r.kind == RegionKind::Branch
            && r.subregion
                .blocks()
                .any(|(name, _)| name.kind() == Kind::SynthTail)
    });
    assert!(has_tail, "the branch body's two exits should be closed via a SyntheticTail");
}

#[test]
fn bahmann_figure_3_two_headers_two_exits() {
    let mut scfg = build(&[
        (0, &[1, 2]),
        (1, &[3]),
        (2, &[4]),
        (3, &[2, 5]),
        (4, &[1, 6]),
        (5, &[7]),
        (6, &[7]),
        (7, &[]),
    ]);
    scfg.restructure().unwrap();

    let loop_region = find_loop_region(&scfg);
    assert_eq!(loop_region.header.map(|h| h.kind()), Some(Kind::SynthHead));
    assert_eq!(loop_region.base.jump_targets.len(), 2, "two exits (5 and 6)");

    let latches: Vec<Name> = loop_region
        .subregion
        .sorted_names()
        .into_iter()
        .filter(|n| n.kind() == Kind::SynthExitLatch)
        .collect();
    assert_eq!(latches.len(), 1);
    let exit_branches: Vec<Name> = loop_region
        .subregion
        .sorted_names()
        .into_iter()
        .filter(|n| n.kind() == Kind::SynthExitBranch)
        .collect();
    assert_eq!(exit_branches.len(), 1, "two distinct exits require a SyntheticExitBranch");
}
