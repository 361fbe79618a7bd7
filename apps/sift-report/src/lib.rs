use std::{
	io::{self, Write},
	path::PathBuf,
	sync::Arc,
};

use clap::{Parser, Subcommand};
use serde_json::Value;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use sift_config::Config;
use sift_domain::ResponseType;
use sift_service::{HistoryQuery, PagedViewRequest, SiftService};
use sift_storage::{db::Db, pg::PgHistoryStore};

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Print one page of history rows as a JSON document.
	Page {
		#[command(flatten)]
		query: QueryArgs,
		#[arg(long, default_value_t = 0)]
		offset: u64,
		/// Defaults to `history.default_page_size`.
		#[arg(long)]
		limit: Option<u32>,
	},
	/// Print every matching history row, one JSON object per line.
	Export {
		#[command(flatten)]
		query: QueryArgs,
	},
}

#[derive(Debug, clap::Args)]
pub struct QueryArgs {
	#[arg(long)]
	pub tenant: String,
	#[arg(long, value_parser = parse_response_type)]
	pub response_type: Option<ResponseType>,
	#[arg(long)]
	pub session: Option<String>,
	#[arg(long)]
	pub contains: Option<String>,
	#[arg(long, value_parser = sift_cli::parse_timestamp)]
	pub from: Option<OffsetDateTime>,
	#[arg(long, value_parser = sift_cli::parse_timestamp)]
	pub to: Option<OffsetDateTime>,
	/// A `history_filter_expr/v1` JSON document.
	#[arg(long, value_parser = sift_cli::parse_json)]
	pub filter: Option<Value>,
}
impl From<QueryArgs> for HistoryQuery {
	fn from(args: QueryArgs) -> Self {
		Self {
			tenant_id: args.tenant,
			analyzed_from: args.from,
			analyzed_to: args.to,
			session_id: args.session,
			query_contains: args.contains,
			filter: args.filter,
			response_type: args.response_type,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;

	init_tracing(&config)?;

	execute(config, args.command, &mut io::stdout().lock()).await
}

/// Runs `command` against the configured history store and writes its output to `out`.
///
/// The store is only read. Tables are expected to exist already.
pub async fn execute(
	config: Config,
	command: Command,
	out: &mut impl Write,
) -> color_eyre::Result<()> {
	let db = Db::connect(&config.storage.postgres).await?;
	let default_limit = config.history.default_page_size;
	let service = SiftService::new(config, Arc::new(PgHistoryStore::new(&db)));

	match command {
		Command::Page { query, offset, limit } => {
			let req = PagedViewRequest {
				query: query.into(),
				offset,
				limit: limit.unwrap_or(default_limit),
			};
			let view = service.paged_view(req).await?;

			serde_json::to_writer_pretty(&mut *out, &view)?;
			writeln!(out)?;
		},
		Command::Export { query } => {
			let view = service.export_view(query.into()).await?;

			for row in &view.rows {
				serde_json::to_writer(&mut *out, row)?;
				writeln!(out)?;
			}

			tracing::debug!(rows = view.rows.len(), "Export written.");
		},
	}

	Ok(())
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

	Ok(())
}

fn parse_response_type(raw: &str) -> Result<ResponseType, String> {
	ResponseType::parse(raw).ok_or_else(|| format!("expected responded or unresponded, got '{raw}'"))
}
