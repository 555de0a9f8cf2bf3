use std::num::NonZeroU64;
use std::path::Path;

/// Character count of a UTF-8 file. Unreadable or non-UTF-8 files count as
/// empty.
pub fn char_count(path: &Path) -> u64 {
    match std::fs::read_to_string(path) {
        Ok(content) => count_chars(&content),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not read file, counting as 0 chars");
            0
        }
    }
}

/// Characters in `text` with line endings normalised: a `\r\n` pair counts
/// once, so CRLF checkouts measure the same as LF ones.
pub fn count_chars(text: &str) -> u64 {
    let crlf = text.matches("\r\n").count();
    (text.chars().count() - crlf) as u64
}

/// Estimated tokens for `chars` characters, rounded up.
pub fn estimate_tokens(chars: u64, chars_per_token: NonZeroU64) -> u64 {
    chars.div_ceil(chars_per_token.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cpt(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[test]
    fn char_count_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "Hello World").unwrap();
        assert_eq!(char_count(&path), 11);
    }

    #[test]
    fn char_count_counts_chars_not_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, "Hello 世界").unwrap();
        assert_eq!(char_count(&path), 8);
    }

    #[test]
    fn char_count_missing_file_is_zero() {
        assert_eq!(char_count(Path::new("/nonexistent/CLAUDE.md")), 0);
    }

    #[test]
    fn char_count_binary_file_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.md");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();
        assert_eq!(char_count(&path), 0);
    }

    #[test]
    fn crlf_counts_as_one_char() {
        assert_eq!(count_chars("x\r\ny"), 3);
        assert_eq!(count_chars("x\ny"), 3);
        assert_eq!(count_chars("x\ry"), 3);
        assert_eq!(count_chars("\r\n\r\n"), 2);
    }

    #[test]
    fn char_count_crlf_file_matches_lf_file() {
        let dir = tempfile::tempdir().unwrap();
        let crlf = dir.path().join("crlf.md");
        let lf = dir.path().join("lf.md");
        std::fs::write(&crlf, "# Title\r\n\r\nBody\r\n").unwrap();
        std::fs::write(&lf, "# Title\n\nBody\n").unwrap();
        assert_eq!(char_count(&crlf), char_count(&lf));
        assert_eq!(char_count(&crlf), 14);
    }

    #[test]
    fn estimate_default_ratio() {
        assert_eq!(estimate_tokens(400, cpt(4)), 100);
    }

    #[test]
    fn estimate_custom_ratio() {
        assert_eq!(estimate_tokens(300, cpt(3)), 100);
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(401, cpt(4)), 101);
        assert_eq!(estimate_tokens(1, cpt(4)), 1);
    }

    #[test]
    fn estimate_zero() {
        assert_eq!(estimate_tokens(0, cpt(4)), 0);
    }

    proptest! {
        #[test]
        fn estimate_is_ceiling(chars in 0u64..10_000_000, ratio in 1u64..64) {
            let tokens = estimate_tokens(chars, cpt(ratio));
            prop_assert!(tokens * ratio >= chars);
            prop_assert!(tokens == 0 || (tokens - 1) * ratio < chars);
        }
    }
}
