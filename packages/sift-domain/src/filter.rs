use std::{
	cmp::Ordering,
	fmt::{Display, Formatter},
};

use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub const HISTORY_FILTER_EXPR_SCHEMA_V1: &str = "history_filter_expr/v1";
pub const MAX_FILTER_DEPTH: usize = 8;
pub const MAX_FILTER_NODES: usize = 128;
pub const MAX_IN_LIST_ITEMS: usize = 128;
pub const MAX_STRING_BYTES: usize = 512;

#[derive(Debug, Clone)]
pub struct FilterParseError {
	path: String,
	message: String,
}
impl FilterParseError {
	pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
		Self { path: path.into(), message: message.into() }
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}
impl Display for FilterParseError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}: {}", self.path, self.message)
	}
}

impl std::error::Error for FilterParseError {}

/// Caller-supplied predicate over history records.
#[derive(Clone, Debug)]
pub struct HistoryFilter {
	expr: FilterExpr,
}
impl HistoryFilter {
	pub fn parse(raw: &Value) -> Result<Self, FilterParseError> {
		let path = "$.filter";
		let obj = raw
			.as_object()
			.ok_or_else(|| FilterParseError::new(path, "filter must be an object."))?;
		let schema = obj.get("schema").and_then(Value::as_str).ok_or_else(|| {
			FilterParseError::new(format!("{path}.schema"), "filter.schema is required.")
		})?;

		if schema != HISTORY_FILTER_EXPR_SCHEMA_V1 {
			return Err(FilterParseError::new(
				format!("{path}.schema"),
				format!(
					"unsupported filter schema '{schema}', expected '{HISTORY_FILTER_EXPR_SCHEMA_V1}'."
				),
			));
		}

		let expr = obj.get("expr").ok_or_else(|| {
			FilterParseError::new(format!("{path}.expr"), "filter.expr is required.")
		})?;
		let mut state = FilterParseState::default();
		let expr = parse_expr(expr, "$.filter.expr", 1, &mut state)?;

		Ok(Self { expr })
	}

	pub fn expr(&self) -> &FilterExpr {
		&self.expr
	}

	pub fn into_expr(self) -> FilterExpr {
		self.expr
	}

	pub fn to_value(&self) -> Value {
		serde_json::json!({ "schema": HISTORY_FILTER_EXPR_SCHEMA_V1, "expr": self.expr.to_value() })
	}
}

/// The record attributes a filter can see.
#[derive(Clone, Copy, Debug)]
pub struct FilterSubject<'a> {
	pub log_id: i64,
	pub session_id: &'a str,
	pub query_text: &'a str,
	pub analyzed_at: OffsetDateTime,
}

#[derive(Default)]
struct FilterParseState {
	nodes: usize,
	max_depth: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterField {
	LogId,
	SessionId,
	QueryText,
	AnalyzedAt,
}
impl FilterField {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::LogId => "log_id",
			Self::SessionId => "session_id",
			Self::QueryText => "query_text",
			Self::AnalyzedAt => "analyzed_at",
		}
	}

	pub fn is_text(self) -> bool {
		matches!(self, Self::SessionId | Self::QueryText)
	}

	fn parse(path: &str, raw: &Value) -> Result<Self, FilterParseError> {
		let field = raw
			.as_str()
			.ok_or_else(|| FilterParseError::new(path, "filter field must be a string."))?
			.to_ascii_lowercase();

		match field.as_str() {
			"log_id" => Ok(Self::LogId),
			"session_id" => Ok(Self::SessionId),
			"query_text" => Ok(Self::QueryText),
			"analyzed_at" => Ok(Self::AnalyzedAt),
			_ => Err(FilterParseError::new(
				path,
				format!(
					"field '{field}' is not in allowlist: log_id, session_id, query_text, analyzed_at"
				),
			)),
		}
	}

	fn lookup<'a>(self, subject: &FilterSubject<'a>) -> SubjectValue<'a> {
		match self {
			Self::LogId => SubjectValue::Integer(subject.log_id),
			Self::SessionId => SubjectValue::String(subject.session_id),
			Self::QueryText => SubjectValue::String(subject.query_text),
			Self::AnalyzedAt => SubjectValue::DateTime(subject.analyzed_at),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
	String(String),
	Integer(i64),
	DateTime(OffsetDateTime),
}
impl FilterValue {
	fn to_value(&self) -> Value {
		match self {
			Self::String(value) => Value::String(value.clone()),
			Self::Integer(value) => serde_json::json!(value),
			Self::DateTime(value) => Value::String(value.format(&Rfc3339).unwrap_or_default()),
		}
	}
}

#[derive(Clone, Copy, Debug)]
enum SubjectValue<'a> {
	String(&'a str),
	Integer(i64),
	DateTime(OffsetDateTime),
}
impl SubjectValue<'_> {
	fn compare(&self, value: &FilterValue) -> Option<Ordering> {
		match (self, value) {
			(Self::String(lhs), FilterValue::String(rhs)) => Some((*lhs).cmp(rhs.as_str())),
			(Self::Integer(lhs), FilterValue::Integer(rhs)) => Some(lhs.cmp(rhs)),
			(Self::DateTime(lhs), FilterValue::DateTime(rhs)) => Some(lhs.cmp(rhs)),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
	And(Vec<FilterExpr>),
	Or(Vec<FilterExpr>),
	Not(Box<FilterExpr>),
	Eq { field: FilterField, value: FilterValue },
	Neq { field: FilterField, value: FilterValue },
	In { field: FilterField, values: Vec<FilterValue> },
	Contains { field: FilterField, value: String },
	Gt { field: FilterField, value: FilterValue },
	Gte { field: FilterField, value: FilterValue },
	Lt { field: FilterField, value: FilterValue },
	Lte { field: FilterField, value: FilterValue },
}
impl FilterExpr {
	/// Conjunction that collapses the trivial cases.
	pub fn all(mut exprs: Vec<Self>) -> Option<Self> {
		match exprs.len() {
			0 => None,
			1 => exprs.pop(),
			_ => Some(Self::And(exprs)),
		}
	}

	pub fn matches(&self, subject: &FilterSubject<'_>) -> bool {
		match self {
			Self::And(nodes) => nodes.iter().all(|node| node.matches(subject)),
			Self::Or(nodes) => nodes.iter().any(|node| node.matches(subject)),
			Self::Not(node) => !node.matches(subject),
			Self::Eq { field, value } =>
				field.lookup(subject).compare(value) == Some(Ordering::Equal),
			Self::Neq { field, value } =>
				field.lookup(subject).compare(value).is_some_and(|ord| ord != Ordering::Equal),
			Self::In { field, values } => {
				let lhs = field.lookup(subject);

				values.iter().any(|value| lhs.compare(value) == Some(Ordering::Equal))
			},
			Self::Contains { field, value } => match field.lookup(subject) {
				SubjectValue::String(text) => text.contains(value.as_str()),
				_ => false,
			},
			Self::Gt { field, value } =>
				field.lookup(subject).compare(value) == Some(Ordering::Greater),
			Self::Gte { field, value } =>
				field.lookup(subject).compare(value).is_some_and(|ord| ord != Ordering::Less),
			Self::Lt { field, value } => field.lookup(subject).compare(value) == Some(Ordering::Less),
			Self::Lte { field, value } =>
				field.lookup(subject).compare(value).is_some_and(|ord| ord != Ordering::Greater),
		}
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::And(exprs) => {
				serde_json::json!({ "op": "and", "args": Value::Array(exprs.iter().map(Self::to_value).collect()) })
			},
			Self::Or(exprs) => {
				serde_json::json!({ "op": "or", "args": Value::Array(exprs.iter().map(Self::to_value).collect()) })
			},
			Self::Not(expr) => serde_json::json!({ "op": "not", "expr": expr.to_value() }),
			Self::Eq { field, value } => leaf_value("eq", *field, value.to_value()),
			Self::Neq { field, value } => leaf_value("neq", *field, value.to_value()),
			Self::In { field, values } => leaf_value(
				"in",
				*field,
				Value::Array(values.iter().map(FilterValue::to_value).collect()),
			),
			Self::Contains { field, value } =>
				leaf_value("contains", *field, Value::String(value.clone())),
			Self::Gt { field, value } => leaf_value("gt", *field, value.to_value()),
			Self::Gte { field, value } => leaf_value("gte", *field, value.to_value()),
			Self::Lt { field, value } => leaf_value("lt", *field, value.to_value()),
			Self::Lte { field, value } => leaf_value("lte", *field, value.to_value()),
		}
	}

	fn parse_args(
		value: &Value,
		path: &str,
		depth: usize,
		state: &mut FilterParseState,
	) -> Result<Vec<Self>, FilterParseError> {
		let nodes =
			value.as_array().ok_or_else(|| FilterParseError::new(path, "op args must be an array."))?;

		if nodes.is_empty() {
			return Err(FilterParseError::new(path, "op args must contain at least one node."));
		}

		nodes
			.iter()
			.enumerate()
			.map(|(index, node)| {
				let child_path = format!("{path}[{index}]");

				parse_expr(node, &child_path, depth.saturating_add(1), state)
			})
			.collect()
	}

	fn parse_in_values(
		field: FilterField,
		value: &Value,
		path: &str,
	) -> Result<Vec<FilterValue>, FilterParseError> {
		let values =
			value.as_array().ok_or_else(|| FilterParseError::new(path, "in value must be an array."))?;

		if values.is_empty() {
			return Err(FilterParseError::new(path, "in list must contain at least one value."));
		}
		if values.len() > MAX_IN_LIST_ITEMS {
			return Err(FilterParseError::new(
				path,
				format!("in list exceeds maximum size ({}/{})", values.len(), MAX_IN_LIST_ITEMS),
			));
		}

		values
			.iter()
			.enumerate()
			.map(|(index, raw)| parse_value(field, raw, &format!("{path}[{index}]")))
			.collect()
	}

	fn validate_metrics(
		path: &str,
		depth: usize,
		state: &mut FilterParseState,
	) -> Result<(), FilterParseError> {
		state.nodes = state.nodes.saturating_add(1);
		state.max_depth = state.max_depth.max(depth);

		if state.nodes > MAX_FILTER_NODES {
			return Err(FilterParseError::new(
				path,
				format!("filter exceeds node limit ({}/{})", state.nodes, MAX_FILTER_NODES),
			));
		}
		if state.max_depth > MAX_FILTER_DEPTH {
			return Err(FilterParseError::new(
				path,
				format!("filter exceeds depth limit ({}/{})", state.max_depth, MAX_FILTER_DEPTH),
			));
		}

		Ok(())
	}

	fn parse_leaf(raw: &Map<String, Value>, op: &str, path: &str) -> Result<Self, FilterParseError> {
		let field_path = format!("{path}.field");
		let field = FilterField::parse(
			&field_path,
			raw.get("field").ok_or_else(|| {
				FilterParseError::new(&field_path, "op node is missing required field 'field'.")
			})?,
		)?;
		let value_path = format!("{path}.value");
		let value_raw = raw.get("value").ok_or_else(|| {
			FilterParseError::new(&value_path, "op node is missing required field 'value'.")
		})?;

		match op {
			"in" => {
				let values = Self::parse_in_values(field, value_raw, &value_path)?;

				return Ok(Self::In { field, values });
			},
			"contains" if !field.is_text() =>
				return Err(FilterParseError::new(
					&field_path,
					format!("contains is not supported on field '{}'.", field.as_str()),
				)),
			"gt" | "gte" | "lt" | "lte" if field.is_text() =>
				return Err(FilterParseError::new(
					&field_path,
					format!("{op} is not supported on field '{}'.", field.as_str()),
				)),
			_ => {},
		}

		let value = parse_value(field, value_raw, &value_path)?;

		match op {
			"eq" => Ok(Self::Eq { field, value }),
			"neq" => Ok(Self::Neq { field, value }),
			"contains" => match value {
				FilterValue::String(value) if !value.is_empty() => Ok(Self::Contains { field, value }),
				_ => Err(FilterParseError::new(
					value_path,
					"contains requires a non-empty string value.",
				)),
			},
			"gt" => Ok(Self::Gt { field, value }),
			"gte" => Ok(Self::Gte { field, value }),
			"lt" => Ok(Self::Lt { field, value }),
			"lte" => Ok(Self::Lte { field, value }),
			_ => Err(FilterParseError::new(path, format!("unsupported leaf op '{op}'."))),
		}
	}
}

fn leaf_value(op: &str, field: FilterField, value: Value) -> Value {
	serde_json::json!({ "op": op, "field": field.as_str(), "value": value })
}

fn parse_expr(
	value: &Value,
	path: &str,
	depth: usize,
	state: &mut FilterParseState,
) -> Result<FilterExpr, FilterParseError> {
	FilterExpr::validate_metrics(path, depth, state)?;

	let Some(map) = value.as_object() else {
		return Err(FilterParseError::new(path, "filter node must be an object."));
	};
	let op = map
		.get("op")
		.and_then(Value::as_str)
		.ok_or_else(|| FilterParseError::new(path, "filter node is missing required string op."))?;

	match op {
		"and" | "or" => {
			let args_path = format!("{path}.args");
			let args = map.get("args").ok_or_else(|| {
				FilterParseError::new(&args_path, format!("{op} node requires args."))
			})?;
			let args = FilterExpr::parse_args(args, &args_path, depth, state)?;

			if op == "and" { Ok(FilterExpr::And(args)) } else { Ok(FilterExpr::Or(args)) }
		},
		"not" => {
			let expr = map.get("expr").ok_or_else(|| {
				FilterParseError::new(format!("{path}.expr"), "not node requires expr.")
			})?;
			let child = parse_expr(expr, &format!("{path}.expr"), depth.saturating_add(1), state)?;

			Ok(FilterExpr::Not(Box::new(child)))
		},
		"eq" | "neq" | "in" | "gt" | "gte" | "lt" | "lte" | "contains" =>
			FilterExpr::parse_leaf(map, op, path),
		_ => Err(FilterParseError::new(path, format!("unsupported filter op '{op}'."))),
	}
}

fn parse_string(path: &str, raw: &Value) -> Result<String, FilterParseError> {
	let value = raw.as_str().ok_or_else(|| FilterParseError::new(path, "string value expected."))?;

	if value.len() > MAX_STRING_BYTES {
		return Err(FilterParseError::new(
			path,
			format!("string value exceeds maximum bytes ({MAX_STRING_BYTES})."),
		));
	}

	Ok(value.to_string())
}

fn parse_value(field: FilterField, raw: &Value, path: &str) -> Result<FilterValue, FilterParseError> {
	match field {
		FilterField::SessionId | FilterField::QueryText =>
			parse_string(path, raw).map(FilterValue::String),
		FilterField::LogId => raw
			.as_i64()
			.map(FilterValue::Integer)
			.ok_or_else(|| FilterParseError::new(path, "integer value expected.")),
		FilterField::AnalyzedAt => OffsetDateTime::parse(parse_string(path, raw)?.as_str(), &Rfc3339)
			.map(FilterValue::DateTime)
			.map_err(|_| FilterParseError::new(path, "datetime value must be RFC3339.")),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::Value;
	use time::OffsetDateTime;

	use crate::filter::{
		FilterSubject, HISTORY_FILTER_EXPR_SCHEMA_V1, HistoryFilter, MAX_FILTER_NODES,
		MAX_IN_LIST_ITEMS, MAX_STRING_BYTES,
	};

	fn wrap(expr: Value) -> Value {
		serde_json::json!({ "schema": HISTORY_FILTER_EXPR_SCHEMA_V1, "expr": expr })
	}

	fn subject() -> FilterSubject<'static> {
		FilterSubject {
			log_id: 42,
			session_id: "session-a",
			query_text: "where is my parcel",
			analyzed_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp"),
		}
	}

	#[test]
	fn parse_requires_known_schema() {
		let raw = serde_json::json!({ "schema": "bad", "expr": { "op": "eq", "field": "log_id", "value": 1 } });

		assert!(HistoryFilter::parse(&raw).is_err());
	}

	#[test]
	fn parse_and_validate_depth_limit() {
		let mut expr = serde_json::json!({ "op": "eq", "field": "log_id", "value": 1 });

		for _ in 0..9 {
			expr = serde_json::json!({ "op": "not", "expr": expr });
		}

		assert!(HistoryFilter::parse(&wrap(expr)).is_err());
	}

	#[test]
	fn parse_and_validate_node_limit() {
		let leaf = serde_json::json!({ "op": "eq", "field": "session_id", "value": "s" });
		let args = vec![leaf.clone(); MAX_FILTER_NODES - 1];
		let expr = serde_json::json!({ "op": "and", "args": args });

		assert!(HistoryFilter::parse(&wrap(expr.clone())).is_ok());

		let expr = serde_json::json!({ "op": "and", "args": [expr, leaf] });

		assert!(HistoryFilter::parse(&wrap(expr)).is_err());
	}

	#[test]
	fn parse_in_list_limits() {
		let values = (0_i64..=MAX_IN_LIST_ITEMS as i64).collect::<Vec<_>>();
		let expr = serde_json::json!({ "op": "in", "field": "log_id", "value": values });

		assert!(HistoryFilter::parse(&wrap(expr)).is_err());

		let expr = serde_json::json!({ "op": "in", "field": "log_id", "value": [] });

		assert!(HistoryFilter::parse(&wrap(expr)).is_err());
	}

	#[test]
	fn parse_rejects_unknown_field_with_json_path() {
		let expr = serde_json::json!({
			"op": "and",
			"args": [
				{ "op": "eq", "field": "log_id", "value": 1 },
				{ "op": "eq", "field": "tenant_id", "value": "t" },
			],
		});
		let err = HistoryFilter::parse(&wrap(expr)).expect_err("expected unknown field error");

		assert_eq!(err.path(), "$.filter.expr.args[1].field");
		assert!(err.to_string().contains("not in allowlist"));
	}

	#[test]
	fn parse_rejects_invalid_value_types() {
		let cases = [
			serde_json::json!({ "op": "eq", "field": "log_id", "value": "one" }),
			serde_json::json!({ "op": "eq", "field": "session_id", "value": 7 }),
			serde_json::json!({ "op": "gte", "field": "analyzed_at", "value": "yesterday" }),
		];

		for expr in cases {
			let err = HistoryFilter::parse(&wrap(expr)).expect_err("expected value type error");

			assert_eq!(err.path(), "$.filter.expr.value");
		}
	}

	#[test]
	fn parse_rejects_unsupported_operator_field_pairs() {
		let contains_on_number =
			serde_json::json!({ "op": "contains", "field": "log_id", "value": "1" });
		let ordering_on_text = serde_json::json!({ "op": "gt", "field": "query_text", "value": "a" });

		assert!(HistoryFilter::parse(&wrap(contains_on_number)).is_err());
		assert!(HistoryFilter::parse(&wrap(ordering_on_text)).is_err());
	}

	#[test]
	fn parse_rejects_oversize_string_with_json_path() {
		let value = "x".repeat(MAX_STRING_BYTES + 1);
		let expr = serde_json::json!({ "op": "eq", "field": "session_id", "value": value });
		let err = HistoryFilter::parse(&wrap(expr)).expect_err("expected string too long error");

		assert!(err.to_string().contains("$.filter.expr.value"));
	}

	#[test]
	fn evaluates_against_record_fields() {
		let filter = HistoryFilter::parse(&wrap(serde_json::json!({
			"op": "and",
			"args": [
				{ "op": "eq", "field": "session_id", "value": "session-a" },
				{ "op": "contains", "field": "query_text", "value": "parcel" },
				{ "op": "gte", "field": "analyzed_at", "value": "2023-11-14T22:13:20Z" },
				{ "op": "not", "expr": { "op": "in", "field": "log_id", "value": [1, 2, 3] } },
			],
		})))
		.expect("valid filter");

		assert!(filter.expr().matches(&subject()));

		let filter = HistoryFilter::parse(&wrap(serde_json::json!({
			"op": "or",
			"args": [
				{ "op": "lt", "field": "log_id", "value": 42 },
				{ "op": "neq", "field": "session_id", "value": "session-a" },
			],
		})))
		.expect("valid filter");

		assert!(!filter.expr().matches(&subject()));
	}

	#[test]
	fn round_trips_to_canonical_json() {
		let raw = wrap(serde_json::json!({ "op": "eq", "field": "LOG_ID", "value": 5 }));
		let filter = HistoryFilter::parse(&raw).expect("valid filter");

		assert_eq!(
			filter.to_value(),
			wrap(serde_json::json!({ "op": "eq", "field": "log_id", "value": 5 }))
		);
	}
}
