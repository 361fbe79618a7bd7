use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use sift_domain::{
	ResponseType,
	filter::{FilterExpr, FilterField, FilterValue, HistoryFilter, MAX_STRING_BYTES},
};
use sift_storage::store::IdScan;

use crate::{Error, Result};

/// Candidate selection shared by the paged and export views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
	pub tenant_id: String,
	/// Inclusive lower bound on `analyzed_at`.
	#[serde(default, with = "crate::time_serde::option")]
	pub analyzed_from: Option<OffsetDateTime>,
	/// Exclusive upper bound on `analyzed_at`.
	#[serde(default, with = "crate::time_serde::option")]
	pub analyzed_to: Option<OffsetDateTime>,
	#[serde(default)]
	pub session_id: Option<String>,
	#[serde(default)]
	pub query_contains: Option<String>,
	/// A `history_filter_expr/v1` document.
	#[serde(default)]
	pub filter: Option<Value>,
	#[serde(default)]
	pub response_type: Option<ResponseType>,
}

/// Validates `query` and turns it into a store scan. Never touches the store.
pub fn build_scan(query: &HistoryQuery) -> Result<IdScan> {
	let tenant_id = query.tenant_id.trim();

	if tenant_id.is_empty() {
		return Err(Error::InvalidRequest { message: "tenant_id is required.".to_string() });
	}

	let mut clauses = Vec::new();

	if let (Some(from), Some(to)) = (query.analyzed_from, query.analyzed_to)
		&& from >= to
	{
		return Err(Error::InvalidFilter {
			message: "analyzed_from must be earlier than analyzed_to.".to_string(),
		});
	}
	if let Some(from) = query.analyzed_from {
		clauses.push(FilterExpr::Gte {
			field: FilterField::AnalyzedAt,
			value: FilterValue::DateTime(from),
		});
	}
	if let Some(to) = query.analyzed_to {
		clauses
			.push(FilterExpr::Lt { field: FilterField::AnalyzedAt, value: FilterValue::DateTime(to) });
	}
	if let Some(session_id) = query.session_id.as_deref() {
		if session_id.trim().is_empty() {
			return Err(Error::InvalidFilter {
				message: "session_id must not be empty when provided.".to_string(),
			});
		}

		clauses.push(FilterExpr::Eq {
			field: FilterField::SessionId,
			value: FilterValue::String(session_id.to_string()),
		});
	}
	if let Some(text) = query.query_contains.as_deref() {
		if text.is_empty() {
			return Err(Error::InvalidFilter {
				message: "query_contains must not be empty when provided.".to_string(),
			});
		}
		if text.len() > MAX_STRING_BYTES {
			return Err(Error::InvalidFilter {
				message: format!("query_contains exceeds maximum bytes ({MAX_STRING_BYTES})."),
			});
		}

		clauses
			.push(FilterExpr::Contains { field: FilterField::QueryText, value: text.to_string() });
	}
	if let Some(raw) = query.filter.as_ref() {
		clauses.push(HistoryFilter::parse(raw)?.into_expr());
	}

	Ok(IdScan::new(tenant_id)
		.with_predicate(FilterExpr::all(clauses))
		.with_response_type(query.response_type))
}
