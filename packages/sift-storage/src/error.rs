#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Decode error: {0}")]
	Decode(String),
	#[error("Data source unavailable: {0}")]
	Unavailable(String),
}
impl Error {
	/// Whether the data source could not be reached. Errors raised by the database itself, such as
	/// a missing table or a denied privilege, are permanent and do not count.
	pub fn is_unavailable(&self) -> bool {
		match self {
			Self::Sqlx(err) => matches!(
				err,
				sqlx::Error::Io(_)
					| sqlx::Error::Tls(_)
					| sqlx::Error::Protocol(_)
					| sqlx::Error::PoolTimedOut
					| sqlx::Error::PoolClosed
					| sqlx::Error::WorkerCrashed
			),
			Self::Unavailable(_) => true,
			Self::InvalidArgument(_) | Self::Decode(_) => false,
		}
	}
}

impl From<sift_domain::ConfidenceError> for Error {
	fn from(err: sift_domain::ConfidenceError) -> Self {
		Self::Decode(err.to_string())
	}
}
