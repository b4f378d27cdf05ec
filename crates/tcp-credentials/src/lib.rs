pub mod credential;
pub mod error;

pub use credential::{CredentialBroker, CredentialRef, InMemoryCredentialBroker, IssueRequest};
pub use error::CredentialError;
