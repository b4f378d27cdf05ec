/// This crate shares [`tcp_domain::DomainError`] rather than defining its own
/// error enum — every variant a provider or driver needs (resource not
/// found, capability unsupported, not scalable, provider not initialized) is
/// already declared there so callers at the HTTP boundary can match on kind
/// without knowing which crate raised it.
pub use tcp_domain::DomainError as ProviderError;
