use std::sync::Arc;

use idlink::{InMemoryContactStore, Observation, ReconciliationEngine};

// Spec section 5: concurrent observations over overlapping clusters must not
// produce split-brain primaries. The in-memory backend serializes
// transactions, so whatever the interleaving, the end state has exactly one
// primary per connected component.

#[test]
fn concurrent_overlapping_merges_converge_to_one_primary() {
    let store = Arc::new(InMemoryContactStore::new());
    let engine = ReconciliationEngine::new(Arc::clone(&store) as _);

    // Seed two independent clusters.
    engine
        .reconcile(&Observation::new(Some("a@x.com"), Some("1")).unwrap())
        .unwrap();
    engine
        .reconcile(&Observation::new(Some("b@x.com"), Some("2")).unwrap())
        .unwrap();

    // Race bridging observations from both directions, plus repeats.
    let mut handles = Vec::new();
    for _ in 0..4 {
        let forward = engine.clone();
        handles.push(std::thread::spawn(move || {
            forward
                .reconcile(&Observation::new(Some("a@x.com"), Some("2")).unwrap())
                .unwrap();
        }));
        let backward = engine.clone();
        handles.push(std::thread::spawn(move || {
            backward
                .reconcile(&Observation::new(Some("b@x.com"), Some("1")).unwrap())
                .unwrap();
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let rows = store.snapshot().unwrap();
    let primaries: Vec<_> = rows.iter().filter(|c| c.is_primary()).collect();
    assert_eq!(primaries.len(), 1, "merged cluster must have one primary");
    let primary_id = primaries[0].id;

    for contact in rows.iter().filter(|c| !c.is_primary()) {
        assert_eq!(contact.linked_id, Some(primary_id));
    }
}

#[test]
fn concurrent_identical_singletons_do_not_duplicate() {
    let store = Arc::new(InMemoryContactStore::new());
    let engine = ReconciliationEngine::new(Arc::clone(&store) as _);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(std::thread::spawn(move || {
            engine
                .reconcile(&Observation::new(Some("solo@x.com"), Some("9")).unwrap())
                .unwrap()
        }));
    }

    let views: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Serialized transactions: exactly one insert, every caller sees it.
    assert_eq!(store.len().unwrap(), 1);
    let primary_id = views[0].primary_contact_id;
    for view in &views {
        assert_eq!(view.primary_contact_id, primary_id);
        assert!(view.secondary_contact_ids.is_empty());
    }
}
