//! Broker request counters.

// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how the broker served embed requests.
#[derive(Debug, Default)]
pub struct BrokerMetrics {
	exchanges: AtomicU64,
	mints: AtomicU64,
	cache_hits: AtomicU64,
	unpersisted: AtomicU64,
	failures: AtomicU64,
}
impl BrokerMetrics {
	/// Returns the number of client-credential exchanges performed.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of embed tokens minted.
	pub fn mints(&self) -> u64 {
		self.mints.load(Ordering::Relaxed)
	}

	/// Returns the number of resolves served from the embed-token store.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of minted tokens the store failed to persist.
	pub fn unpersisted(&self) -> u64 {
		self.unpersisted.load(Ordering::Relaxed)
	}

	/// Returns the number of failed resolves.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_mint(&self) {
		self.mints.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_unpersisted(&self) {
		self.unpersisted.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
