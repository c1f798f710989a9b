//! Round-robin pool of interchangeable provider clients.
//!
//! The pool keeps no health state: rotation away from a throttled credential
//! is the retry coordinator's job. Acquisition is a read of the current
//! client list plus one atomic increment-and-wrap on the cursor.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::core::error::SdkError;

/// An authentication token plus an optional endpoint override.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    base_url: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Last four characters, for log lines.
    pub fn redacted(&self) -> String {
        let tail: String = self
            .token
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("…{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.redacted())
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Trim tokens, drop empties and duplicates; first occurrence keeps its slot.
pub fn normalize_credentials<I>(credentials: I) -> Vec<Credential>
where
    I: IntoIterator<Item = Credential>,
{
    let mut seen = HashSet::new();
    credentials
        .into_iter()
        .filter_map(|c| {
            let token = c.token.trim();
            if token.is_empty() || !seen.insert(token.to_string()) {
                return None;
            }
            Some(Credential::new(token, c.base_url))
        })
        .collect()
}

pub struct CredentialPool<C> {
    clients: RwLock<Arc<[Arc<C>]>>,
    cursor: AtomicUsize,
}

impl<C> Default for CredentialPool<C> {
    fn default() -> Self {
        Self {
            clients: RwLock::new(Arc::from(Vec::new())),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl<C> fmt::Debug for CredentialPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("size", &self.size())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl<C> CredentialPool<C> {
    /// An empty pool; every `acquire` fails until `initialize` is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from credentials in one step.
    pub fn with_credentials<I, F>(credentials: I, build: F) -> Self
    where
        I: IntoIterator<Item = Credential>,
        F: FnMut(&Credential) -> C,
    {
        let pool = Self::new();
        pool.initialize(credentials, build);
        pool
    }

    /// Replace every client and reset the cursor to the first one.
    ///
    /// Must not be called while a batch is in flight; running tasks would
    /// observe the new list midway through their rotation.
    pub fn initialize<I, F>(&self, credentials: I, mut build: F) -> usize
    where
        I: IntoIterator<Item = Credential>,
        F: FnMut(&Credential) -> C,
    {
        let clients: Arc<[Arc<C>]> = normalize_credentials(credentials)
            .iter()
            .map(|c| Arc::new(build(c)))
            .collect();
        let size = clients.len();
        {
            let mut slot = self.clients.write().unwrap_or_else(|e| e.into_inner());
            *slot = clients;
            self.cursor.store(0, Ordering::Release);
        }
        tracing::info!(target: "storyboard::pool", pool_size = size, "credential pool initialized");
        size
    }

    pub fn size(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Hand out the client at the cursor and advance it.
    pub fn acquire(&self) -> Result<Arc<C>, SdkError> {
        self.acquire_indexed().map(|(_, client)| client)
    }

    /// Like `acquire`, also returning the slot index for logging.
    pub fn acquire_indexed(&self) -> Result<(usize, Arc<C>), SdkError> {
        let clients = self.snapshot();
        let len = clients.len();
        if len == 0 {
            return Err(SdkError::PoolUninitialized);
        }
        let prev = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        let idx = prev % len;
        Ok((idx, Arc::clone(&clients[idx])))
    }

    fn snapshot(&self) -> Arc<[Arc<C>]> {
        Arc::clone(&self.clients.read().unwrap_or_else(|e| e.into_inner()))
    }
}
