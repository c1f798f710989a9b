use crate::core::pool::{Credential, CredentialPool};
use crate::core::{ErrorKind, SdkError};

fn keys(names: &[&str]) -> Vec<Credential> {
    names.iter().map(|n| Credential::new(*n, None)).collect()
}

fn token_of(c: &Credential) -> String {
    c.token().to_string()
}

#[test]
fn acquire_is_round_robin_and_wraps() {
    let pool = CredentialPool::with_credentials(keys(&["a", "b", "c"]), token_of);
    let seen: Vec<String> = (0..7).map(|_| pool.acquire().unwrap().to_string()).collect();
    assert_eq!(seen, ["a", "b", "c", "a", "b", "c", "a"]);
}

#[test]
fn empty_pool_fails_every_acquire() {
    let pool: CredentialPool<String> = CredentialPool::new();
    assert!(pool.is_empty());
    for _ in 0..3 {
        assert!(matches!(pool.acquire(), Err(SdkError::PoolUninitialized)));
    }
    let pool = CredentialPool::with_credentials(keys(&["", "   "]), token_of);
    assert_eq!(pool.size(), 0);
    assert_eq!(pool.acquire().unwrap_err().kind(), ErrorKind::PoolUninitialized);
}

#[test]
fn initialize_filters_and_keeps_first_occurrence_order() {
    let pool = CredentialPool::new();
    let size = pool.initialize(keys(&["b", "a", " b ", "", "c", "a"]), token_of);
    assert_eq!(size, 3);
    let seen: Vec<String> = (0..3).map(|_| pool.acquire().unwrap().to_string()).collect();
    assert_eq!(seen, ["b", "a", "c"]);
}

#[test]
fn reinitialize_resets_cursor() {
    let pool = CredentialPool::with_credentials(keys(&["a", "b", "c"]), token_of);
    pool.acquire().unwrap();
    pool.acquire().unwrap();
    pool.initialize(keys(&["x", "y"]), token_of);
    assert_eq!(pool.size(), 2);
    let (slot, client) = pool.acquire_indexed().unwrap();
    assert_eq!((slot, client.as_str()), (0, "x"));

    pool.initialize(Vec::new(), token_of);
    assert!(matches!(pool.acquire(), Err(SdkError::PoolUninitialized)));
}

#[test]
fn concurrent_acquires_spread_evenly() {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    let pool = Arc::new(CredentialPool::with_credentials(keys(&["a", "b", "c", "d"]), token_of));
    let counts = Arc::new(Mutex::new(HashMap::<String, usize>::new()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let counts = Arc::clone(&counts);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let client = pool.acquire().unwrap();
                    *counts.lock().unwrap().entry(client.to_string()).or_default() += 1;
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let counts = counts.lock().unwrap();
    assert_eq!(counts.len(), 4);
    assert!(counts.values().all(|n| *n == 200));
}
