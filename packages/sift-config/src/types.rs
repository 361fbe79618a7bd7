use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub history: History,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct History {
	/// Page size used by callers that do not pass an explicit limit.
	pub default_page_size: u32,
	/// Upper bound for a single page; larger limits are rejected.
	pub max_page_size: u32,
	/// Run the four per-algorithm aggregations concurrently instead of one after another.
	#[serde(default = "default_concurrent_aggregation")]
	pub concurrent_aggregation: bool,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_concurrent_aggregation() -> bool {
	true
}
