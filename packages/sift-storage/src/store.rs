use std::{future::Future, pin::Pin};

use sift_domain::{Algorithm, ClassificationHit, ResponseType, filter::FilterExpr};

use crate::{
	Result,
	models::{BaseRow, IntentMeta},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Candidate identifier scan over one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct IdScan {
	pub tenant_id: String,
	pub predicate: Option<FilterExpr>,
	pub response_type: Option<ResponseType>,
}
impl IdScan {
	pub fn new(tenant_id: impl Into<String>) -> Self {
		Self { tenant_id: tenant_id.into(), predicate: None, response_type: None }
	}

	pub fn with_predicate(mut self, predicate: Option<FilterExpr>) -> Self {
		self.predicate = predicate;

		self
	}

	pub fn with_response_type(mut self, response_type: Option<ResponseType>) -> Self {
		self.response_type = response_type;

		self
	}

	/// The result-detail source is only needed to evaluate a response-type filter. Scans without
	/// one must not touch it.
	pub fn needs_result_detail(&self) -> bool {
		self.response_type.is_some()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	pub offset: u64,
	pub limit: u32,
}

/// Base row fetch for a resolved identifier set, ordered by `analyzed_at` then `log_id`, both
/// descending, and sliced by `window` when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFetch {
	pub log_ids: Vec<i64>,
	pub window: Option<Window>,
}

/// Read-only access to the analysis history.
///
/// `best_classifications` may return several hits per record; callers reduce them with
/// [`ClassificationHit::rank_cmp`]. Stores that can aggregate on their side should return only
/// the winners.
pub trait HistoryStore
where
	Self: Send + Sync,
{
	fn scan_ids<'a>(&'a self, scan: &'a IdScan) -> BoxFuture<'a, Result<Vec<i64>>>;

	fn best_classifications<'a>(
		&'a self,
		log_ids: &'a [i64],
		algorithm: Algorithm,
	) -> BoxFuture<'a, Result<Vec<ClassificationHit>>>;

	fn intents<'a>(&'a self, intent_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<IntentMeta>>>;

	fn fetch_rows<'a>(&'a self, fetch: &'a RowFetch) -> BoxFuture<'a, Result<Vec<BaseRow>>>;
}
