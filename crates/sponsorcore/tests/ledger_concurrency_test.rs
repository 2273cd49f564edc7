//! Concurrency tests for the reward ledger
//!
//! Every dispense runs in its own OS thread with its own pooled connection,
//! so the SQLite write lock is the only thing serialising them.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{MockPlatform, TestEnvironment};
use pretty_assertions::assert_eq;
use sponsorcore::DispenseReceipt;

#[test]
fn test_parallel_dispenses_lose_no_increment() {
    const THREADS: i64 = 24;
    let env = TestEnvironment::new(MockPlatform::new());
    let token_id = env.ledger.add_token("T1").unwrap();
    let barrier = Arc::new(Barrier::new(THREADS as usize));

    let handles: Vec<_> = (0..THREADS)
        .map(|user| {
            let ledger = env.ledger.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                ledger.dispense(token_id, user)
            })
        })
        .collect();

    let mut counts: Vec<u64> = handles
        .into_iter()
        .map(|handle| match handle.join().unwrap().unwrap() {
            DispenseReceipt::Recorded { sent_count, .. } => sent_count,
            DispenseReceipt::AlreadyRecorded => panic!("distinct users must each get a record"),
        })
        .collect();
    counts.sort_unstable();

    assert_eq!(counts, (1..=THREADS as u64).collect::<Vec<_>>());
    assert_eq!(
        env.ledger.get_token(token_id).unwrap().unwrap().sent_count,
        THREADS as u64
    );
}

#[test]
fn test_parallel_dispenses_for_one_user_record_once() {
    const THREADS: usize = 8;
    let env = TestEnvironment::new(MockPlatform::new());
    let token_id = env.ledger.add_token("T1").unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ledger = env.ledger.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                ledger.dispense(token_id, 77)
            })
        })
        .collect();

    let recorded = handles
        .into_iter()
        .map(|handle| handle.join().unwrap().unwrap())
        .filter(|receipt| matches!(receipt, DispenseReceipt::Recorded { .. }))
        .count();

    assert_eq!(recorded, 1);
    assert_eq!(env.ledger.get_token(token_id).unwrap().unwrap().sent_count, 1);
    assert_eq!(env.ledger.records_for_user(77).unwrap().len(), 1);
}

#[test]
fn test_latest_token_is_stable_between_writes() {
    let env = TestEnvironment::new(MockPlatform::new());
    env.ledger.add_token("A").unwrap();
    let newest = env.ledger.add_token("B").unwrap();

    let reads: Vec<i64> = (0..10)
        .map(|_| env.ledger.latest_token().unwrap().unwrap().id)
        .collect();
    assert!(reads.iter().all(|id| *id == newest));
}
