use memory::GuestMemoryError;
use thiserror::Error;

/// Board construction failures.
///
/// Configuration inconsistencies are not errors: they are clamped or downgraded while the
/// selection is resolved. The only fatal condition is failing to obtain the RAM pool, which is
/// reported before anything has been registered with the host.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("failed to allocate board RAM: {0}")]
    Allocation(#[from] GuestMemoryError),
}
