use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sift_domain::Algorithm;
use sift_storage::store::{RowFetch, Window};

use crate::{
	Error, Result, SiftService,
	aggregator::{self, BestClassification},
	assembler::{self, HistoryRow},
	resolver::{self, HistoryQuery},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedViewRequest {
	#[serde(flatten)]
	pub query: HistoryQuery,
	#[serde(default)]
	pub offset: u64,
	pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedView {
	/// Size of the whole resolved id set, not of this page.
	pub total_count: u64,
	pub offset: u64,
	pub limit: u32,
	pub rows: Vec<HistoryRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportView {
	pub rows: Vec<HistoryRow>,
}

impl SiftService {
	/// All matching `log_id`s for `query`, ascending and unpaginated.
	pub async fn resolve_ids(&self, query: &HistoryQuery) -> Result<Vec<i64>> {
		let scan = resolver::build_scan(query)?;
		let ids =
			self.store.scan_ids(&scan).await.map_err(|err| Error::store("resolve_ids", err))?;

		tracing::debug!(
			tenant_id = scan.tenant_id.as_str(),
			with_result_detail = scan.needs_result_detail(),
			count = ids.len(),
			"Resolved candidate ids."
		);

		Ok(ids)
	}

	pub async fn best_per_record(
		&self,
		log_ids: &[i64],
		algorithm: Algorithm,
	) -> Result<HashMap<i64, BestClassification>> {
		aggregator::resolve_best_per_record(self.store.as_ref(), log_ids, algorithm).await
	}

	/// One page of history rows. Classifications are aggregated over the page's records only.
	pub async fn paged_view(&self, req: PagedViewRequest) -> Result<PagedView> {
		let max_page_size = self.cfg.history.max_page_size;

		if req.limit == 0 || req.limit > max_page_size {
			return Err(Error::InvalidRequest {
				message: format!("limit must be between 1 and {max_page_size}."),
			});
		}

		if i64::try_from(req.offset).is_err() {
			return Err(Error::InvalidRequest {
				message: format!("offset must not exceed {}.", i64::MAX),
			});
		}

		let ids = self.resolve_ids(&req.query).await?;
		let total_count = ids.len() as u64;

		if ids.is_empty() {
			return Ok(PagedView { total_count, offset: req.offset, limit: req.limit, rows: Vec::new() });
		}

		let fetch =
			RowFetch { log_ids: ids, window: Some(Window { offset: req.offset, limit: req.limit }) };
		let base =
			self.store.fetch_rows(&fetch).await.map_err(|err| Error::store("fetch_rows", err))?;
		let page_ids = base.iter().map(|row| row.log_id).collect::<Vec<_>>();
		let results = aggregator::resolve_all(
			self.store.as_ref(),
			&page_ids,
			self.cfg.history.concurrent_aggregation,
		)
		.await?;
		let rows = assembler::assemble(base, &results, false);

		tracing::info!(
			tenant_id = req.query.tenant_id.trim(),
			total_count,
			offset = req.offset,
			rows = rows.len(),
			"Built paged history view."
		);

		Ok(PagedView { total_count, offset: req.offset, limit: req.limit, rows })
	}

	/// Every matching row, newest first, with intent ids included.
	pub async fn export_view(&self, query: HistoryQuery) -> Result<ExportView> {
		let ids = self.resolve_ids(&query).await?;

		if ids.is_empty() {
			return Ok(ExportView { rows: Vec::new() });
		}

		let fetch = RowFetch { log_ids: ids, window: None };
		let (results, base) = tokio::try_join!(
			aggregator::resolve_all(
				self.store.as_ref(),
				&fetch.log_ids,
				self.cfg.history.concurrent_aggregation,
			),
			async {
				self.store.fetch_rows(&fetch).await.map_err(|err| Error::store("fetch_rows", err))
			},
		)?;
		let rows = assembler::assemble(base, &results, true);

		tracing::info!(
			tenant_id = query.tenant_id.trim(),
			rows = rows.len(),
			"Built history export."
		);

		Ok(ExportView { rows })
	}
}
