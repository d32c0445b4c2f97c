//! Completion parsing
//!
//! The model wraps its playlist between two sentinel markers and separates
//! entries with a delimiter. Anything outside the first sentinel pair is
//! ignored.

/// Extract track requests (`"<title> <artist>"`) from a raw completion
///
/// Returns an empty list when the sentinel pair is missing; callers treat
/// that as a regeneration that produced no playlist.
pub fn parse_completion(raw: &str, sentinel: &str, delimiter: &str) -> Vec<String> {
    if sentinel.is_empty() || delimiter.is_empty() {
        return Vec::new();
    }

    let mut sections = raw.split(sentinel);
    sections.next();
    let (Some(body), Some(_)) = (sections.next(), sections.next()) else {
        tracing::debug!("Completion has no sentinel pair");
        return Vec::new();
    };

    body.trim()
        .split(delimiter)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTINEL: &str = "$PLAYLIST$";

    #[test]
    fn test_parses_delimited_playlist() {
        let tracks = parse_completion(
            "$PLAYLIST$Song A Artist A;Song B Artist B$PLAYLIST$",
            SENTINEL,
            ";",
        );
        assert_eq!(tracks, vec!["Song A Artist A", "Song B Artist B"]);
    }

    #[test]
    fn test_no_sentinel_yields_empty() {
        assert!(parse_completion("Sorry, I can't help with that.", SENTINEL, ";").is_empty());
    }

    #[test]
    fn test_single_sentinel_yields_empty() {
        assert!(parse_completion("Here you go: $PLAYLIST$Song A;Song B", SENTINEL, ";").is_empty());
    }

    #[test]
    fn test_surrounding_text_and_whitespace() {
        let raw = "Sure! Here is the playlist:\n$PLAYLIST$\n Song A Artist A ;\nSong B Artist B;; \n$PLAYLIST$\nEnjoy the party.";
        assert_eq!(
            parse_completion(raw, SENTINEL, ";"),
            vec!["Song A Artist A", "Song B Artist B"]
        );
    }

    #[test]
    fn test_only_first_pair_is_used() {
        let raw = "$PLAYLIST$A;B$PLAYLIST$ and also $PLAYLIST$C$PLAYLIST$";
        assert_eq!(parse_completion(raw, SENTINEL, ";"), vec!["A", "B"]);
    }

    #[test]
    fn test_empty_pair_yields_empty() {
        assert!(parse_completion("$PLAYLIST$  $PLAYLIST$", SENTINEL, ";").is_empty());
    }
}
