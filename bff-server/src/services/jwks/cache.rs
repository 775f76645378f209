use std::{
    num::NonZeroUsize,
    sync::Mutex,
    time::{Duration, Instant},
};

use lru::LruCache;

/// Resolved certificates keyed by key identifier.
pub trait CertificateCache: Send + Sync {
    fn get(&self, kid: &str) -> Option<String>;
    fn put(&self, kid: &str, pem: &str);
}

impl<T: CertificateCache + ?Sized> CertificateCache for Box<T> {
    fn get(&self, kid: &str) -> Option<String> {
        (**self).get(kid)
    }

    fn put(&self, kid: &str, pem: &str) {
        (**self).put(kid, pem)
    }
}

/// Never stores anything, so every verification fetches the key set.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl CertificateCache for NoCache {
    fn get(&self, _kid: &str) -> Option<String> {
        None
    }

    fn put(&self, _kid: &str, _pem: &str) {}
}

pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, (Instant, String)>>,
}

impl TtlCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl CertificateCache for TtlCache {
    fn get(&self, kid: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        let (stored, pem) = entries.get(kid)?;
        if stored.elapsed() < self.ttl {
            return Some(pem.clone());
        }
        entries.pop(kid);
        None
    }

    fn put(&self, kid: &str, pem: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(kid.to_owned(), (Instant::now(), pem.to_owned()));
        }
    }
}
