use crate::core::pool::{Credential, CredentialPool};
use crate::core::retry::{RetryConfig, RetryCoordinator};
use crate::core::{ErrorKind, SdkError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn pool_of(names: &[&str]) -> Arc<CredentialPool<String>> {
    Arc::new(CredentialPool::with_credentials(
        names.iter().map(|n| Credential::new(*n, None)),
        |c| c.token().to_string(),
    ))
}

fn rate_limited() -> SdkError {
    SdkError::RateLimited {
        retry_after_ms: None,
        source: None,
    }
}

fn overloaded() -> SdkError {
    SdkError::Overloaded {
        status: 503,
        message: "busy".into(),
        source: None,
    }
}

/// Records which client each attempt used and answers from a script.
#[derive(Clone, Default)]
struct Attempts {
    used: Arc<Mutex<Vec<String>>>,
}

impl Attempts {
    fn record(&self, client: &str) -> usize {
        let mut used = self.used.lock().unwrap();
        used.push(client.to_string());
        used.len()
    }

    fn used(&self) -> Vec<String> {
        self.used.lock().unwrap().clone()
    }
}

#[test]
fn attempts_cover_pool_or_retry_budget() {
    let config = RetryConfig::immediate(2);
    assert_eq!(config.attempts_for(1), 3);
    assert_eq!(config.attempts_for(3), 3);
    assert_eq!(config.attempts_for(5), 5);
    assert_eq!(RetryConfig::immediate(0).attempts_for(0), 1);
}

#[tokio::test]
async fn persistent_rate_limit_tries_every_credential_once() {
    let coordinator = RetryCoordinator::new(pool_of(&["k1", "k2", "k3", "k4"]), RetryConfig::immediate(2));
    let attempts = Attempts::default();
    let result: Result<(), SdkError> = coordinator
        .execute(|client| {
            attempts.record(&client);
            async { Err(rate_limited()) }
        })
        .await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::RateLimited);
    assert_eq!(attempts.used(), ["k1", "k2", "k3", "k4"]);
}

#[tokio::test]
async fn small_pool_still_gets_retry_budget() {
    let coordinator = RetryCoordinator::new(pool_of(&["only"]), RetryConfig::immediate(2));
    let attempts = Attempts::default();
    let result: Result<(), SdkError> = coordinator
        .execute(|client| {
            attempts.record(&client);
            async { Err(overloaded()) }
        })
        .await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::Overloaded);
    assert_eq!(attempts.used(), ["only", "only", "only"]);
}

#[tokio::test]
async fn malformed_response_is_not_retried() {
    let coordinator = RetryCoordinator::new(pool_of(&["k1", "k2", "k3"]), RetryConfig::immediate(2));
    let attempts = Attempts::default();
    let result: Result<(), SdkError> = coordinator
        .execute(|client| {
            attempts.record(&client);
            async { Err(SdkError::malformed("no image payload")) }
        })
        .await;
    assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedResponse);
    assert_eq!(attempts.used().len(), 1);
}

#[tokio::test]
async fn rotates_to_next_credential_after_throttle() {
    let coordinator = RetryCoordinator::new(pool_of(&["k1", "k2", "k3"]), RetryConfig::immediate(2));
    let attempts = Attempts::default();
    let result = coordinator
        .execute(|client| {
            let n = attempts.record(&client);
            async move {
                if n < 3 {
                    Err(rate_limited())
                } else {
                    Ok(client)
                }
            }
        })
        .await;
    assert_eq!(*result.unwrap(), "k3");
    assert_eq!(attempts.used(), ["k1", "k2", "k3"]);
}

#[tokio::test]
async fn empty_pool_fails_without_attempts() {
    let coordinator = RetryCoordinator::new(Arc::new(CredentialPool::<String>::new()), RetryConfig::default());
    let attempts = Attempts::default();
    let result: Result<(), SdkError> = coordinator
        .execute(|client| {
            attempts.record(&client);
            async { Ok(()) }
        })
        .await;
    assert!(matches!(result, Err(SdkError::PoolUninitialized)));
    assert!(attempts.used().is_empty());
}

#[tokio::test(start_paused = true)]
async fn backoff_runs_between_attempts_only() {
    let coordinator = RetryCoordinator::new(
        pool_of(&["k1", "k2", "k3"]),
        RetryConfig::custom(2, Duration::from_secs(1)),
    );
    let started = tokio::time::Instant::now();
    let result: Result<(), SdkError> = coordinator
        .execute(|_client| async { Err(rate_limited()) })
        .await;
    assert!(result.is_err());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");
}
