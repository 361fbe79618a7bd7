//! A recording wrapper around any history store.

use std::{
	collections::HashSet,
	fmt::{Display, Formatter},
	sync::{
		Mutex, PoisonError,
		atomic::{AtomicUsize, Ordering},
	},
};

use sift_domain::{Algorithm, ClassificationHit};
use sift_storage::{
	Error, Result,
	models::{BaseRow, IntentMeta},
	store::{BoxFuture, HistoryStore, IdScan, RowFetch},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOperation {
	ScanIds,
	BestClassifications,
	Intents,
	FetchRows,
}
impl StoreOperation {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ScanIds => "scan_ids",
			Self::BestClassifications => "best_classifications",
			Self::Intents => "intents",
			Self::FetchRows => "fetch_rows",
		}
	}

	fn slot(self) -> usize {
		match self {
			Self::ScanIds => 0,
			Self::BestClassifications => 1,
			Self::Intents => 2,
			Self::FetchRows => 3,
		}
	}
}
impl Display for StoreOperation {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Counts calls per operation, remembers which records were classified, and fails operations on
/// request as an unreachable data source would.
pub struct SpyStore<S> {
	inner: S,
	calls: [AtomicUsize; 4],
	scan_detail_reads: AtomicUsize,
	classified: Mutex<HashSet<i64>>,
	failing: Mutex<HashSet<StoreOperation>>,
	failing_algorithms: Mutex<HashSet<Algorithm>>,
}
impl<S> SpyStore<S>
where
	S: HistoryStore,
{
	pub fn new(inner: S) -> Self {
		Self {
			inner,
			calls: Default::default(),
			scan_detail_reads: AtomicUsize::new(0),
			classified: Mutex::default(),
			failing: Mutex::default(),
			failing_algorithms: Mutex::default(),
		}
	}

	pub fn inner(&self) -> &S {
		&self.inner
	}

	/// Makes every later call of `operation` fail as unavailable.
	pub fn fail_on(&self, operation: StoreOperation) {
		self.failing.lock().unwrap_or_else(PoisonError::into_inner).insert(operation);
	}

	/// Fails `best_classifications` for `algorithm` only.
	pub fn fail_algorithm(&self, algorithm: Algorithm) {
		self.failing_algorithms.lock().unwrap_or_else(PoisonError::into_inner).insert(algorithm);
	}

	pub fn recover(&self, operation: StoreOperation) {
		self.failing.lock().unwrap_or_else(PoisonError::into_inner).remove(&operation);
	}

	pub fn calls(&self, operation: StoreOperation) -> usize {
		self.calls[operation.slot()].load(Ordering::SeqCst)
	}

	/// How many id scans needed result-detail rows.
	pub fn scan_detail_reads(&self) -> usize {
		self.scan_detail_reads.load(Ordering::SeqCst)
	}

	/// Every `log_id` ever passed to `best_classifications`, ascending.
	pub fn classified_ids(&self) -> Vec<i64> {
		let mut ids = self
			.classified
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.copied()
			.collect::<Vec<_>>();

		ids.sort_unstable();

		ids
	}

	fn enter(&self, operation: StoreOperation) -> Result<()> {
		self.calls[operation.slot()].fetch_add(1, Ordering::SeqCst);

		if self.failing.lock().unwrap_or_else(PoisonError::into_inner).contains(&operation) {
			return Err(Error::Unavailable(format!("{operation} could not reach the history store.")));
		}

		Ok(())
	}
}

impl<S> HistoryStore for SpyStore<S>
where
	S: HistoryStore,
{
	fn scan_ids<'a>(&'a self, scan: &'a IdScan) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			self.enter(StoreOperation::ScanIds)?;

			if scan.needs_result_detail() {
				self.scan_detail_reads.fetch_add(1, Ordering::SeqCst);
			}

			self.inner.scan_ids(scan).await
		})
	}

	fn best_classifications<'a>(
		&'a self,
		log_ids: &'a [i64],
		algorithm: Algorithm,
	) -> BoxFuture<'a, Result<Vec<ClassificationHit>>> {
		Box::pin(async move {
			self.enter(StoreOperation::BestClassifications)?;

			let failing = self
				.failing_algorithms
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.contains(&algorithm);

			if failing {
				return Err(Error::Unavailable(format!("{algorithm} results could not be read.")));
			}

			self.classified
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.extend(log_ids.iter().copied());

			self.inner.best_classifications(log_ids, algorithm).await
		})
	}

	fn intents<'a>(&'a self, intent_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<IntentMeta>>> {
		Box::pin(async move {
			self.enter(StoreOperation::Intents)?;

			self.inner.intents(intent_ids).await
		})
	}

	fn fetch_rows<'a>(&'a self, fetch: &'a RowFetch) -> BoxFuture<'a, Result<Vec<BaseRow>>> {
		Box::pin(async move {
			self.enter(StoreOperation::FetchRows)?;

			self.inner.fetch_rows(fetch).await
		})
	}
}
