pub mod provider;
pub mod signature;

pub use provider::{BrolexyProvider, FetchOutcome, ProductId, SourceProduct};
pub use signature::{generate_signature, SignedTime};
