//! Record extraction from downloaded patent documents.

mod claims;

pub use claims::{extract_claims, parse_claims, Claims, ClaimsOutcome, ClaimsRecord};
