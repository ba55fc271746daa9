//! Dict/YAML round-tripping and restructuring idempotence (spec §6, §8).

mod support;

use scfg_restructure::{Scfg, ScfgDict};
use support::build;

fn a_restructured_graph() -> Scfg {
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
    scfg
}

#[test]
fn dict_round_trip_preserves_structure() {
    let scfg = a_restructured_graph();
    let dict = scfg.to_dict();
    let reconstructed = Scfg::from_dict(&dict).unwrap();
    assert_eq!(dict, reconstructed.to_dict());
}

#[test]
fn yaml_round_trip_preserves_structure() {
    let scfg = a_restructured_graph();
    let yaml = scfg.to_yaml().unwrap();
    let reconstructed = Scfg::from_yaml(&yaml).unwrap();
    assert_eq!(scfg.to_dict(), reconstructed.to_dict());
}

#[test]
fn from_dict_rejects_a_malformed_edge_target() {
    let mut dict = ScfgDict {
        blocks: Default::default(),
        edges: Default::default(),
        backedges: Default::default(),
    };
    dict.blocks
        .insert("basic_block_0".to_string(), scfg_restructure::BlockDict::Basic);
    dict.edges
        .insert("basic_block_0".to_string(), vec!["not-a-rendered-name".to_string()]);

    assert!(Scfg::from_dict(&dict).is_err());
}

#[test]
fn restructuring_is_idempotent() {
    let mut once = build(&[(0, &[1]), (1, &[1, 2]), (2, &[])]);
    once.restructure().unwrap();
    let mut twice = once.clone();
    twice.restructure().unwrap();
    assert_eq!(once.to_dict(), twice.to_dict());
}
