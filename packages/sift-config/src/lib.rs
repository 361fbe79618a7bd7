mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, History, Postgres, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.history.default_page_size == 0 {
		return Err(Error::Validation {
			message: "history.default_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.history.max_page_size == 0 {
		return Err(Error::Validation {
			message: "history.max_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.history.default_page_size > cfg.history.max_page_size {
		return Err(Error::Validation {
			message: "history.default_page_size must not exceed history.max_page_size."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	cfg.storage.postgres.dsn = cfg.storage.postgres.dsn.trim().to_string();
}
