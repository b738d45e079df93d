//! Per-title exclusive locks for version assignment

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::common::{CoreError, Result};

/// Registry handing out one async mutex per key.
///
/// Entries nobody holds or waits on are pruned on each acquisition.
#[derive(Default)]
pub struct KeyedLocks {
	inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub struct KeyedGuard {
	key: String,
	_guard: OwnedMutexGuard<()>,
}

impl KeyedGuard {
	pub fn key(&self) -> &str {
		&self.key
	}
}

impl KeyedLocks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Wait up to `timeout` for exclusive ownership of `key`.
	pub async fn acquire(&self, key: &str, timeout: Duration) -> Result<KeyedGuard> {
		let lock = {
			let mut map = self.inner.lock();
			map.retain(|_, lock| Arc::strong_count(lock) > 1);
			map.entry(key.to_string())
				.or_insert_with(|| Arc::new(AsyncMutex::new(())))
				.clone()
		};

		match tokio::time::timeout(timeout, lock.lock_owned()).await {
			Ok(guard) => {
				debug!(key, "acquired lock");
				Ok(KeyedGuard {
					key: key.to_string(),
					_guard: guard,
				})
			}
			Err(_) => {
				warn!(key, ?timeout, "timed out waiting for lock");
				Err(CoreError::Conflict(format!(
					"timed out waiting for lock on '{key}'"
				)))
			}
		}
	}

	/// Number of keys currently tracked
	pub fn len(&self) -> usize {
		self.inner.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn second_holder_times_out() {
		let locks = KeyedLocks::new();
		let _held = locks.acquire("标题A", Duration::from_secs(1)).await.unwrap();

		let err = locks
			.acquire("标题A", Duration::from_millis(20))
			.await
			.err()
			.unwrap();
		assert!(err.is_retryable());

		// Other keys are independent
		assert!(locks.acquire("标题B", Duration::from_millis(20)).await.is_ok());
	}

	#[tokio::test]
	async fn released_keys_are_pruned() {
		let locks = KeyedLocks::new();
		{
			let guard = locks.acquire("a", Duration::from_secs(1)).await.unwrap();
			assert_eq!(guard.key(), "a");
		}
		let _b = locks.acquire("b", Duration::from_secs(1)).await.unwrap();
		assert_eq!(locks.len(), 1);
	}
}
