use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use sift_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with_history(default_page_size: i64, max_page_size: i64) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");
	let history = root
		.get_mut("history")
		.and_then(Value::as_table_mut)
		.expect("Template config must include [history].");

	history.insert("default_page_size".to_string(), Value::Integer(default_page_size));
	history.insert("max_page_size".to_string(), Value::Integer(max_page_size));

	toml::to_string(&value).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sift_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

#[test]
fn sample_config_loads() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected sample config to load.");

	assert_eq!(cfg.service.log_level, "info");
	assert_eq!(cfg.storage.postgres.pool_max_conns, 4);
	assert_eq!(cfg.history.default_page_size, 20);
	assert_eq!(cfg.history.max_page_size, 500);
	assert!(cfg.history.concurrent_aggregation);
}

#[test]
fn concurrent_aggregation_defaults_to_true() {
	let payload = SAMPLE_CONFIG_TEMPLATE_TOML.replace("concurrent_aggregation = true", "");
	let cfg: Config = toml::from_str(&payload).expect("Failed to parse test config.");

	assert!(cfg.history.concurrent_aggregation);
}

#[test]
fn blank_log_level_normalizes_to_info() {
	let payload = SAMPLE_CONFIG_TEMPLATE_TOML.replace("log_level = \"info\"", "log_level = \"  \"");
	let path = write_temp_config(payload);
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert_eq!(result.expect("Expected config to load.").service.log_level, "info");
}

#[test]
fn default_page_size_must_be_positive() {
	let path = write_temp_config(sample_toml_with_history(0, 500));
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected page size validation error.");

	assert!(
		err.to_string().contains("history.default_page_size must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn default_page_size_must_fit_max_page_size() {
	let path = write_temp_config(sample_toml_with_history(50, 10));
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected page size validation error.");

	assert!(
		err.to_string().contains("history.default_page_size must not exceed history.max_page_size."),
		"Unexpected error: {err}"
	);
}

#[test]
fn pool_size_must_be_positive() {
	let mut cfg = base_config();

	cfg.storage.postgres.pool_max_conns = 0;

	let err = sift_config::validate(&cfg).expect_err("Expected pool size validation error.");

	assert!(matches!(err, Error::Validation { .. }));
	assert!(err.to_string().contains("storage.postgres.pool_max_conns"));
}

#[test]
fn dsn_must_be_non_empty() {
	let mut cfg = base_config();

	cfg.storage.postgres.dsn = "   ".to_string();

	let err = sift_config::validate(&cfg).expect_err("Expected dsn validation error.");

	assert!(err.to_string().contains("storage.postgres.dsn must be non-empty."));
}

#[test]
fn missing_file_reports_read_error() {
	let mut path = env::temp_dir();

	path.push("sift_config_test_missing_file.toml");

	let err = sift_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}

#[test]
fn malformed_toml_reports_parse_error() {
	let path = write_temp_config("[history\nmax_page_size = ".to_string());
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	assert!(matches!(result, Err(Error::ParseConfig { .. })));
}
