// Path: crates/api/src/state/tests/mod.rs
use crate::state::{
    apply_changeset, next_prefix, StateAccess, StateOverlay, StateRead, StateReadExt,
    StateScanIter, StateWriteExt,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_types::error::StateError;

// A minimal ordered base for exercising overlays.
#[derive(Default)]
struct MapState {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MapState {
    fn with(pairs: &[(&[u8], &[u8])]) -> Self {
        Self {
            data: pairs
                .iter()
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .collect(),
        }
    }
}

impl StateRead for MapState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.data.get(key).cloned())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<StateScanIter<'_>, StateError> {
        let prefix = prefix.to_vec();
        Ok(Box::new(
            self.data
                .range(prefix.clone()..)
                .take_while(move |(k, _)| k.starts_with(&prefix))
                .map(|(k, v)| Ok((Arc::from(k.as_slice()), Arc::from(v.as_slice())))),
        ))
    }
}

fn keys(state: &dyn StateRead, prefix: &[u8]) -> Vec<Vec<u8>> {
    state
        .prefix_scan(prefix)
        .unwrap()
        .map(|r| r.unwrap().0.to_vec())
        .collect()
}

#[test]
fn next_prefix_increments_last_non_ff_byte() {
    assert_eq!(next_prefix(b"ab"), Some(b"ac".to_vec()));
    assert_eq!(next_prefix(&[0x01, 0xff]), Some(vec![0x02]));
    assert_eq!(next_prefix(&[0xff, 0xff]), None);
    assert_eq!(next_prefix(&[]), None);
}

#[test]
fn overlay_reads_through_and_shadows() {
    let base = MapState::with(&[(b"a", b"1"), (b"b", b"2")]);
    let mut overlay = StateOverlay::new(&base);
    overlay.insert(b"a", b"10").unwrap();
    overlay.delete(b"b").unwrap();
    overlay.insert(b"c", b"3").unwrap();

    assert_eq!(overlay.get(b"a").unwrap(), Some(b"10".to_vec()));
    assert_eq!(overlay.get(b"b").unwrap(), None);
    assert_eq!(overlay.get(b"c").unwrap(), Some(b"3".to_vec()));
    // The base is untouched.
    assert_eq!(base.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn prefix_scan_merges_in_key_order_and_skips_tombstones() {
    let base = MapState::with(&[(b"p:1", b"a"), (b"p:3", b"c"), (b"q:1", b"x")]);
    let mut overlay = StateOverlay::new(&base);
    overlay.insert(b"p:2", b"b").unwrap();
    overlay.delete(b"p:3").unwrap();
    overlay.insert(b"p:4", b"d").unwrap();
    assert_eq!(
        keys(&overlay, b"p:"),
        vec![b"p:1".to_vec(), b"p:2".to_vec(), b"p:4".to_vec()]
    );
}

#[test]
fn nested_scope_rolls_back_independently() {
    let base = MapState::with(&[(b"fee", b"0")]);
    let mut outer = StateOverlay::new(&base);
    outer.insert(b"fee", b"1").unwrap();

    // A failed inner scope is simply dropped.
    {
        let mut inner = StateOverlay::new(&outer);
        inner.insert(b"mutation", b"bad").unwrap();
    }
    assert_eq!(outer.get(b"mutation").unwrap(), None);

    // A successful inner scope is applied to its parent.
    let changes = {
        let mut inner = StateOverlay::new(&outer);
        inner.insert(b"mutation", b"ok").unwrap();
        inner.delete(b"fee").unwrap();
        inner.into_ordered_batch()
    };
    apply_changeset(&mut outer, &changes).unwrap();
    assert_eq!(outer.get(b"mutation").unwrap(), Some(b"ok".to_vec()));
    assert_eq!(outer.get(b"fee").unwrap(), None);

    let (inserts, deletes) = outer.into_ordered_batch();
    assert_eq!(inserts, vec![(b"mutation".to_vec(), b"ok".to_vec())]);
    assert_eq!(deletes, vec![b"fee".to_vec()]);
}

#[test]
fn overlays_nest_through_dyn_state_access() {
    let base = MapState::default();
    let mut outer = StateOverlay::new(&base);
    let scope: &mut dyn StateAccess = &mut outer;
    let changes = {
        let mut inner = StateOverlay::new(&*scope);
        inner.put_encoded(b"n", &7u64).unwrap();
        inner.into_ordered_batch()
    };
    apply_changeset(scope, &changes).unwrap();
    assert_eq!(scope.get_decoded::<u64>(b"n").unwrap(), Some(7));
}

#[test]
fn typed_scan_strips_prefix() {
    let base = MapState::default();
    let mut overlay = StateOverlay::new(&base);
    overlay.put_encoded(b"v::a", &1u32).unwrap();
    overlay.put_encoded(b"v::b", &2u32).unwrap();
    overlay.insert(b"v::c", &[1]).unwrap();
    overlay.delete(b"v::c").unwrap();
    let decoded: Vec<(Vec<u8>, u32)> = overlay.scan_decoded(b"v::").unwrap();
    assert_eq!(decoded, vec![(b"a".to_vec(), 1), (b"b".to_vec(), 2)]);

    overlay.insert(b"v::d", &[1]).unwrap();
    assert!(matches!(
        overlay.scan_decoded::<u32>(b"v::"),
        Err(StateError::Decode(_))
    ));
}

proptest! {
    #[test]
    fn overlay_scan_matches_materialized_state(
        base_pairs in proptest::collection::btree_map(
            proptest::collection::vec(0u8..4, 1..4), any::<u8>(), 0..16),
        ops in proptest::collection::vec(
            (proptest::collection::vec(0u8..4, 1..4), proptest::option::of(any::<u8>())), 0..16),
    ) {
        let base = MapState {
            data: base_pairs.iter().map(|(k, v)| (k.clone(), vec![*v])).collect(),
        };
        let mut expected = base.data.clone();
        let mut overlay = StateOverlay::new(&base);
        for (k, v) in &ops {
            match v {
                Some(v) => {
                    overlay.insert(k, &[*v]).unwrap();
                    expected.insert(k.clone(), vec![*v]);
                }
                None => {
                    overlay.delete(k).unwrap();
                    expected.remove(k);
                }
            }
        }
        let scanned: Vec<(Vec<u8>, Vec<u8>)> = overlay
            .prefix_scan(&[])
            .unwrap()
            .map(|r| r.map(|(k, v)| (k.to_vec(), v.to_vec())).unwrap())
            .collect();
        prop_assert_eq!(scanned, expected.into_iter().collect::<Vec<_>>());
    }
}
