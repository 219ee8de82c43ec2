//! Positive cache in front of a durable registry.
//!
//! Only pairs the inner registry has confirmed as consumed are cached, so a
//! cache hit can answer "consumed" and a miss always falls through. The inner
//! registry stays the source of truth.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dashmap::DashSet;
use relay_types::Result;

use crate::NonceRegistry;

pub struct CachedNonceRegistry {
    inner: Arc<dyn NonceRegistry>,
    consumed: DashSet<(Address, U256)>,
}

impl CachedNonceRegistry {
    pub fn new(inner: Arc<dyn NonceRegistry>) -> Self {
        Self { inner, consumed: DashSet::new() }
    }

    pub fn cached_len(&self) -> usize {
        self.consumed.len()
    }
}

#[async_trait]
impl NonceRegistry for CachedNonceRegistry {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn try_consume(&self, user: Address, nonce: U256) -> Result<bool> {
        if self.consumed.contains(&(user, nonce)) {
            return Ok(false);
        }
        // Either outcome means the pair is now consumed.
        let won = self.inner.try_consume(user, nonce).await?;
        self.consumed.insert((user, nonce));
        Ok(won)
    }

    async fn is_consumed(&self, user: Address, nonce: U256) -> Result<bool> {
        if self.consumed.contains(&(user, nonce)) {
            return Ok(true);
        }
        let consumed = self.inner.is_consumed(user, nonce).await?;
        if consumed {
            self.consumed.insert((user, nonce));
        }
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryNonceRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls that reach the inner registry.
    #[derive(Default)]
    struct CountingRegistry {
        inner: MemoryNonceRegistry,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NonceRegistry for CountingRegistry {
        async fn try_consume(&self, user: Address, nonce: U256) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.try_consume(user, nonce).await
        }

        async fn is_consumed(&self, user: Address, nonce: U256) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.is_consumed(user, nonce).await
        }
    }

    #[tokio::test]
    async fn test_cache_answers_consumed_without_inner_call() {
        let inner = Arc::new(CountingRegistry::default());
        let cached = CachedNonceRegistry::new(inner.clone());
        let user = Address::repeat_byte(1);
        let nonce = U256::from(3u64);

        assert!(cached.try_consume(user, nonce).await.unwrap());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        assert!(!cached.try_consume(user, nonce).await.unwrap());
        assert!(cached.is_consumed(user, nonce).await.unwrap());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_miss_falls_through_to_inner() {
        let inner = Arc::new(CountingRegistry::default());
        inner.inner.try_consume(Address::repeat_byte(2), U256::from(1u64)).await.unwrap();
        let cached = CachedNonceRegistry::new(inner.clone());

        // consumed before the cache existed
        assert!(!cached.try_consume(Address::repeat_byte(2), U256::from(1u64)).await.unwrap());
        assert!(!cached.is_consumed(Address::repeat_byte(2), U256::from(2u64)).await.unwrap());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.cached_len(), 1);
    }
}
