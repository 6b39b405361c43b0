//! Token overlap check between a video and a subtitle name.

use std::collections::HashSet;

use crate::subtitle::language::tokenize;

/// Check if two names share at least one token.
///
/// This is intentionally permissive: a shared release group tag or year is enough.
#[must_use]
pub fn is_related(video_base_name: &str, subtitle_file_name: &str) -> bool {
    let video_tokens: HashSet<String> = tokenize(video_base_name).into_iter().collect();
    tokenize(subtitle_file_name)
        .iter()
        .any(|token| video_tokens.contains(token))
}

#[cfg(test)]
mod related_tests {
    use super::*;

    #[test]
    fn shared_token_is_related() {
        assert!(is_related("Show.S01E01.1080p-GRP", "grp.english.srt"));
        assert!(is_related("Movie.2024", "Other.2024.srt"));
    }

    #[test]
    fn no_shared_token_is_not_related() {
        assert!(!is_related("Movie", "fra.srt"));
        assert!(!is_related("Alpha.S01E01", "Beta-S01E02.srt"));
        assert!(!is_related("", "anything.srt"));
    }

    #[test]
    fn comparison_is_case_insensitive() {
        assert!(is_related("THE.MOVIE", "the_movie.srt"));
    }

    #[test]
    fn relation_is_symmetric() {
        let pairs = [
            ("Show.S01E01", "Show.S01E01.eng.srt"),
            ("Movie", "fra.srt"),
            ("a-b-c", "c d e"),
            ("x", "y"),
        ];
        for (a, b) in pairs {
            assert_eq!(is_related(a, b), is_related(b, a), "{a} / {b}");
        }
    }
}
