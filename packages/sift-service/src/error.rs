use sift_domain::filter::FilterParseError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid filter: {message}")]
	InvalidFilter { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Data source unavailable during {operation}: {message}")]
	DataSourceUnavailable { operation: String, message: String },
	#[error("Storage error during {operation}: {message}")]
	Storage { operation: String, message: String },
}
impl Error {
	/// Maps a store failure onto the operation that was being attempted.
	pub(crate) fn store(operation: impl Into<String>, err: sift_storage::Error) -> Self {
		let operation = operation.into();

		match err {
			sift_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			err if err.is_unavailable() =>
				Self::DataSourceUnavailable { operation, message: err.to_string() },
			err => Self::Storage { operation, message: err.to_string() },
		}
	}
}

impl From<FilterParseError> for Error {
	fn from(err: FilterParseError) -> Self {
		Self::InvalidFilter { message: err.to_string() }
	}
}
