pub mod algorithm;
pub mod batch;
pub mod classification;
pub mod confidence;
pub mod filter;
pub mod verdict;

pub use algorithm::Algorithm;
pub use classification::ClassificationHit;
pub use confidence::{Confidence, ConfidenceError};
pub use verdict::{Outcome, ResponseType, classify};
