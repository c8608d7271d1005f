use chrono::Utc;

/// Source of nonces for signed payloads.
///
/// Called exactly once per signed request or signed connection. Ordering
/// across concurrent calls is the provider's concern; the client never
/// checks it.
pub trait NonceProvider: Send + Sync {
    fn nonce(&self) -> u64;
}

impl<F> NonceProvider for F
where
    F: Fn() -> u64 + Send + Sync,
{
    fn nonce(&self) -> u64 {
        self()
    }
}

/// Wall clock in milliseconds since the Unix epoch (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochMillis;

impl NonceProvider for EpochMillis {
    fn nonce(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Wall clock in whole seconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochSeconds;

impl NonceProvider for EpochSeconds {
    fn nonce(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}
