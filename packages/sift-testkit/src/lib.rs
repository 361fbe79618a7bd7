//! Throwaway PostgreSQL history databases and store spies for integration tests.

pub mod spy;

mod error;

pub use error::{Error, Result};
pub use spy::{SpyStore, StoreOperation};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::runtime::Builder;
use uuid::Uuid;

use sift_storage::{db::Db, pg::PgHistoryStore};

pub const PG_DSN_ENV: &str = "SIFT_PG_DSN";

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

pub fn env_dsn() -> Option<String> {
	env::var(PG_DSN_ENV).ok()
}

/// A uniquely named database on the server behind `SIFT_PG_DSN`, dropped on cleanup or drop.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	/// Creates an empty database. Use [`TestDatabase::history`] for one with the history tables.
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse {PG_DSN_ENV}: {err}.")))?;
		let (admin, mut conn) = connect_admin(&base).await?;
		let name = format!("sift_test_{}", Uuid::new_v4().simple());

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create {name}: {err}.")))?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Connects to the database, creates the history tables, and returns a store over them.
	pub async fn history(&self) -> Result<HistoryDatabase> {
		let cfg = sift_config::Postgres { dsn: self.dsn.clone(), pool_max_conns: 4 };
		let db = Db::connect(&cfg).await?;

		db.ensure_schema().await?;

		let store = PgHistoryStore::new(&db);

		Ok(HistoryDatabase { db, store })
	}

	pub async fn cleanup(mut self) -> Result<()> {
		drop_database(&self.name, &self.admin).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = self.name.clone();
		let admin = self.admin.clone();
		let worker = thread::spawn(move || {
			let result = Builder::new_current_thread()
				.enable_all()
				.build()
				.map_err(|err| Error::Message(err.to_string()))
				.and_then(|runtime| runtime.block_on(drop_database(&name, &admin)));

			if let Err(err) = result {
				eprintln!("Failed to drop test database {name}: {err}.");
			}
		});
		let _ = worker.join();
	}
}

/// A bootstrapped history database. `db` is for seeding through `sift_storage::queries`.
pub struct HistoryDatabase {
	pub db: Db,
	pub store: PgHistoryStore,
}
impl HistoryDatabase {
	/// Closes the pool so the database can be dropped without terminating live sessions.
	pub async fn close(self) {
		self.db.pool.close().await;
	}
}

async fn connect_admin(base: &PgConnectOptions) -> Result<(PgConnectOptions, PgConnection)> {
	let mut errors = Vec::new();

	for database in ADMIN_DATABASES {
		let options = base.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => errors.push(format!("{database}: {err}")),
		}
	}

	Err(Error::Message(format!("No admin database reachable ({}).", errors.join("; "))))
}

async fn drop_database(name: &str, admin: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin).await?;
	// Best effort. Sessions of other roles cannot always be terminated.
	let _ = sqlx::query(
		"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str()).await?;

	Ok(())
}
