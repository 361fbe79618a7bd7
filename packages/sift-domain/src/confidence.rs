//! Exact decimal confidence scores.
//!
//! Scores arrive as the store's decimal text (for example `NUMERIC::text`) and are displayed
//! verbatim. Ordering compares the decimal digits directly, so no binary floating point rounding
//! is involved and `0.910` equals `0.91` while each keeps its own display form.

use std::{
	cmp::Ordering,
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidenceError {
	raw: String,
}
impl Display for ConfidenceError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "'{}' is not a plain decimal confidence value", self.raw)
	}
}

impl std::error::Error for ConfidenceError {}

#[derive(Debug, Clone)]
pub struct Confidence {
	text: String,
	negative: bool,
	// Integer digits without leading zeros.
	integer: String,
	// Fraction digits without trailing zeros.
	fraction: String,
}
impl Confidence {
	pub fn parse(raw: &str) -> Result<Self, ConfidenceError> {
		let text = raw.trim();
		let err = || ConfidenceError { raw: raw.to_string() };
		let (negative, unsigned) = match text.as_bytes().first() {
			Some(b'-') => (true, &text[1..]),
			Some(b'+') => (false, &text[1..]),
			_ => (false, text),
		};
		let (integer, fraction) = match unsigned.split_once('.') {
			Some((integer, fraction)) => (integer, fraction),
			None => (unsigned, ""),
		};

		if integer.is_empty() && fraction.is_empty() {
			return Err(err());
		}
		if !integer.bytes().chain(fraction.bytes()).all(|byte| byte.is_ascii_digit()) {
			return Err(err());
		}

		let integer = integer.trim_start_matches('0').to_string();
		let fraction = fraction.trim_end_matches('0').to_string();
		let is_zero = integer.is_empty() && fraction.is_empty();

		Ok(Self { text: text.to_string(), negative: negative && !is_zero, integer, fraction })
	}

	/// Display form exactly as stored.
	pub fn as_str(&self) -> &str {
		&self.text
	}

	fn magnitude_cmp(&self, other: &Self) -> Ordering {
		self.integer
			.len()
			.cmp(&other.integer.len())
			.then_with(|| self.integer.cmp(&other.integer))
			.then_with(|| self.fraction.cmp(&other.fraction))
	}
}

impl Ord for Confidence {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self.negative, other.negative) {
			(false, true) => Ordering::Greater,
			(true, false) => Ordering::Less,
			(false, false) => self.magnitude_cmp(other),
			(true, true) => other.magnitude_cmp(self),
		}
	}
}

impl PartialOrd for Confidence {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Confidence {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Confidence {}

impl FromStr for Confidence {
	type Err = ConfidenceError;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		Self::parse(raw)
	}
}

impl Display for Confidence {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.text)
	}
}

impl Serialize for Confidence {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.text)
	}
}

impl<'de> Deserialize<'de> for Confidence {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		Self::parse(&raw).map_err(serde::de::Error::custom)
	}
}
