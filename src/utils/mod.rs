pub mod env;

pub use env::get_env_with_prefix;

/// Current unix time in seconds.
///
/// Billing records store timestamps as unix seconds; a clock before the
/// epoch degrades to zero rather than panicking.
#[must_use]
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
