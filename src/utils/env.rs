/// Get environment variable with LINKDECK_ prefix, falling back to unprefixed version
///
/// This helper function checks for `LINKDECK_{key}` first, then falls back to `{key}`
/// for compatibility with standard environment variable naming.
///
/// # Examples
///
/// ```rust
/// use linkdeck::utils::get_env_with_prefix;
///
/// // Checks LINKDECK_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
///
/// // Checks LINKDECK_RAZORPAY_KEY_ID first, then RAZORPAY_KEY_ID
/// let key_id = get_env_with_prefix("RAZORPAY_KEY_ID");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("LINKDECK_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        // Test with LINKDECK_ prefix
        unsafe {
            std::env::set_var("LINKDECK_TEST_VAR", "prefixed_value");
        }
        assert_eq!(get_env_with_prefix("TEST_VAR"), Some("prefixed_value".to_string()));
        unsafe {
            std::env::remove_var("LINKDECK_TEST_VAR");
        }

        // Test with unprefixed fallback
        unsafe {
            std::env::set_var("FALLBACK_VAR", "unprefixed_value");
        }
        assert_eq!(get_env_with_prefix("FALLBACK_VAR"), Some("unprefixed_value".to_string()));
        unsafe {
            std::env::remove_var("FALLBACK_VAR");
        }

        // Test non-existent variable
        assert_eq!(get_env_with_prefix("NON_EXISTENT_VAR"), None);
    }
}
