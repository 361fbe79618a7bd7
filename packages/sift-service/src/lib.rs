pub mod aggregator;
pub mod assembler;
pub mod history;
pub mod resolver;
pub mod time_serde;

mod error;

pub use aggregator::{AlgorithmResults, BestClassification};
pub use assembler::{EntityExtraction, HistoryRow, NodeContext};
pub use error::{Error, Result};
pub use history::{ExportView, PagedView, PagedViewRequest};
pub use resolver::HistoryQuery;

use std::sync::Arc;

use sift_config::Config;
use sift_storage::store::HistoryStore;

/// Read-only history views over an explicitly supplied store.
pub struct SiftService {
	pub cfg: Config,
	pub store: Arc<dyn HistoryStore>,
}
impl SiftService {
	pub fn new(cfg: Config, store: Arc<dyn HistoryStore>) -> Self {
		Self { cfg, store }
	}
}
