//! Small string helpers shared by log and report rendering.

/// Longest prefix of `s` that fits in `max_bytes` and ends on a UTF-8
/// character boundary.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_input_unchanged() {
        assert_eq!(truncate_str("94110", 10), "94110");
        assert_eq!(truncate_str("", 0), "");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_str("median_price", 6), "median");
    }

    #[test]
    fn test_truncate_backs_off_multibyte() {
        // 'é' is 2 bytes; cutting inside it keeps only "caf"
        assert_eq!(truncate_str("café au lait", 4), "caf");
        assert_eq!(truncate_str("café au lait", 5), "café");
    }
}
