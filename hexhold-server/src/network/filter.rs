//! Chat/name profanity filtering.
//!
//! The real filter is an external collaborator; the server only depends on
//! this narrow interface. The default implementation masks a small built-in
//! word list.

/// Text sanitizer applied to player names and chat messages.
pub trait ProfanityFilter: Send + Sync {
    /// Return the text with offending words masked.
    fn clean(&self, text: &str) -> String;
}

/// Masks every case-insensitive occurrence of its word list with asterisks.
pub struct WordListFilter {
    words: Vec<&'static str>,
}

impl WordListFilter {
    pub fn new(words: Vec<&'static str>) -> Self {
        Self { words }
    }
}

impl Default for WordListFilter {
    fn default() -> Self {
        Self::new(vec!["fuck", "shit", "bitch", "cunt", "nigger", "faggot"])
    }
}

impl ProfanityFilter for WordListFilter {
    fn clean(&self, text: &str) -> String {
        let mut result = text.to_string();
        let lower = text.to_lowercase();
        for word in &self.words {
            let mut search = 0;
            while let Some(found) = lower[search..].find(word) {
                let start = search + found;
                let end = start + word.len();
                result.replace_range(start..end, &"*".repeat(word.len()));
                search = end;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_listed_words_case_insensitively() {
        let filter = WordListFilter::new(vec!["bad"]);
        assert_eq!(filter.clean("so BAD it hurts"), "so *** it hurts");
        assert_eq!(filter.clean("badbad"), "******");
    }

    #[test]
    fn clean_text_passes_through() {
        let filter = WordListFilter::default();
        assert_eq!(filter.clean("gg wp"), "gg wp");
    }
}
