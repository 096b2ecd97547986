//! Idempotency keys for job submissions.
//!
//! Every logical operation carries one key; retried submissions reuse it so the server can
//! deduplicate them into a single job.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;
use uuid::Builder;

/// Produces a fresh key per logical operation.
pub trait IdempotencyKeyGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> IdempotencyKeyGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Default generator: random (version 4) UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidKeyGenerator;

impl IdempotencyKeyGenerator for UuidKeyGenerator {
    fn generate(&self) -> String {
        generate_idempotency_key()
    }
}

static DEGRADED_WARNED: AtomicBool = AtomicBool::new(false);

/// Random UUID v4 from the OS secure RNG, or from a non-cryptographic RNG when the OS
/// source is unavailable.
pub fn generate_idempotency_key() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid_from_bytes(bytes),
        Err(e) => {
            if !DEGRADED_WARNED.swap(true, Ordering::Relaxed) {
                warn!(error = %e, "secure random source unavailable, idempotency keys are degraded");
            }
            fallback_idempotency_key()
        }
    }
}

/// Degraded mode: same UUID v4 layout, lower collision resistance.
pub fn fallback_idempotency_key() -> String {
    uuid_from_bytes(fastrand::u128(..).to_le_bytes())
}

fn uuid_from_bytes(bytes: [u8; 16]) -> String {
    Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}
