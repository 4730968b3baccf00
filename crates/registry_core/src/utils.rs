//! Small shared helpers.

/// Current time as Unix epoch seconds.
pub fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp_is_recent() {
        // 2020-01-01
        assert!(current_timestamp() > 1_577_836_800);
    }
}
