//! The verification pipeline: three independent checks folded into one
//! weighted verdict.

pub mod aggregate;
pub mod citations;
pub mod claims;
pub mod consistency;
pub mod pipeline;
pub mod similarity;

pub use aggregate::RiskAggregator;
pub use citations::CitationVerifier;
pub use claims::ClaimVerifier;
pub use consistency::{ConsistencyChecker, ConsistencySettings};
pub use pipeline::{HallucinationDetector, VerificationSuite};
