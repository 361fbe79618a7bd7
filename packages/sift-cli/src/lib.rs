//! Pieces shared by the command-line front ends.

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default())
		.valid(AnsiColor::Green.on_default())
}

/// Value parser for RFC 3339 timestamp flags.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
	OffsetDateTime::parse(raw.trim(), &Rfc3339)
		.map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

/// Value parser for flags that take an inline JSON document.
pub fn parse_json(raw: &str) -> Result<Value, String> {
	serde_json::from_str(raw).map_err(|err| format!("invalid JSON: {err}"))
}

#[cfg(test)]
mod tests {
	use crate::{parse_json, parse_timestamp};

	#[test]
	fn parses_timestamps_with_offsets() {
		let parsed = parse_timestamp("2024-03-01T09:30:00+09:00").expect("valid timestamp");

		assert_eq!(parsed.unix_timestamp(), 1_709_253_000);
		assert!(parse_timestamp("2024-03-01").is_err());
	}

	#[test]
	fn rejects_malformed_json() {
		assert!(parse_json(r#"{"schema": "history_filter_expr/v1"}"#).is_ok());
		assert!(parse_json("{schema}").unwrap_err().starts_with("invalid JSON"));
	}
}
