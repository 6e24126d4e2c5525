// Toxic lexicon matching: words, phrases, and emoji.
//
// Words and emoji live in two separate typed tables. Word entries match only
// on whole-word boundaries of the lowercased text, so "skill" never reports
// "kill". Emoji entries have no boundary concept and match on containment.
//
// The lexicon is built once at startup and shared behind an Arc.

use anyhow::{Context, Result};
use regex::Regex;

/// Toxic words and phrases, in scan order.
pub const TOXIC_WORDS: &[&str] = &[
    "hate",
    "kill",
    "die",
    "idiot",
    "stupid",
    "dumb",
    "fool",
    "moron",
    "ugly",
    "disgusting",
    "terrible",
    "awful",
    "horrible",
    "worst",
    "bad",
    "useless",
    "loser",
    "pathetic",
    "trash",
    "shut up",
];

/// Toxic emoji glyphs, in scan order (after all words).
pub const TOXIC_EMOJI: &[&str] = &[
    "\u{1F595}", // middle finger
    "\u{1F4A9}", // pile of poo
    "\u{1F92C}", // symbols over mouth
    "\u{1F621}", // pouting face
    "\u{1F620}", // angry face
    "\u{1F44E}", // thumbs down
    "\u{1F52A}", // kitchen knife
    "\u{1F92E}", // vomiting face
];

/// Pictographic code point ranges treated as emoji.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F1E6, 0x1F1FF), // regional indicators (flags)
    (0x1F300, 0x1F5FF), // symbols & pictographs (includes skin tones)
    (0x1F600, 0x1F64F), // emoticons
    (0x1F680, 0x1F6FF), // transport & map
    (0x1F900, 0x1F9FF), // supplemental symbols & pictographs
    (0x1FA70, 0x1FAFF), // symbols & pictographs extended-A
    (0x2600, 0x26FF),   // misc symbols
    (0x2700, 0x27BF),   // dingbats
    (0x2B50, 0x2B55),   // stars and circles
];

/// Combining code points that only ever decorate an emoji.
const EMOJI_JOINERS: &[char] = &['\u{200D}', '\u{FE0F}', '\u{20E3}'];

/// True if `c` falls in one of the pictographic emoji ranges.
pub fn is_emoji_char(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| cp >= start && cp <= end)
}

/// True if the text contains any emoji at all, toxic or not.
pub fn contains_any_emoji(text: &str) -> bool {
    text.chars().any(is_emoji_char)
}

/// Remove every emoji code point (and the joiners that glue them together).
pub fn strip_emoji(text: &str) -> String {
    text.chars()
        .filter(|c| !is_emoji_char(*c) && !EMOJI_JOINERS.contains(c))
        .collect()
}

/// A lexicon word together with its compiled whole-word pattern.
struct WordEntry {
    word: String,
    pattern: Regex,
}

/// Immutable toxic lexicon with separate word and emoji tables.
pub struct Lexicon {
    words: Vec<WordEntry>,
    emoji: Vec<String>,
}

impl Lexicon {
    /// Build a lexicon from custom tables. Words are lowercased.
    pub fn new<W, E>(words: W, emoji: E) -> Result<Self>
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| {
                let word = w.as_ref().trim().to_lowercase();
                let pattern = word_boundary_pattern(&word)?;
                Ok(WordEntry { word, pattern })
            })
            .collect::<Result<Vec<_>>>()?;

        let emoji = emoji
            .into_iter()
            .map(|e| e.as_ref().to_string())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self { words, emoji })
    }

    /// The built-in English lexicon.
    pub fn builtin() -> Result<Self> {
        Self::new(TOXIC_WORDS.iter(), TOXIC_EMOJI.iter())
    }

    /// Find every toxic word and emoji in the text.
    ///
    /// Words come first in table order, then emoji in table order. Each
    /// signal appears once no matter how often it repeats.
    pub fn find_signals(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        let lowered = text.to_lowercase();
        let mut signals: Vec<String> = self
            .words
            .iter()
            .filter(|entry| entry.pattern.is_match(&lowered))
            .map(|entry| entry.word.clone())
            .collect();

        signals.extend(
            self.emoji
                .iter()
                .filter(|glyph| text.contains(glyph.as_str()))
                .cloned(),
        );

        signals
    }

    /// True if `signal` is a word (or phrase) entry rather than an emoji.
    pub fn is_word(&self, signal: &str) -> bool {
        self.words.iter().any(|entry| entry.word == signal)
    }

    /// The compiled whole-word pattern for a lexicon word, if it is one.
    /// Patterns expect lowercased input.
    pub fn word_pattern(&self, word: &str) -> Option<&Regex> {
        self.words
            .iter()
            .find(|entry| entry.word == word)
            .map(|entry| &entry.pattern)
    }

    /// All word entries, in scan order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|entry| entry.word.as_str())
    }

    /// All emoji entries, in scan order.
    pub fn emoji(&self) -> impl Iterator<Item = &str> {
        self.emoji.iter().map(String::as_str)
    }
}

fn word_boundary_pattern(word: &str) -> Result<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(word)))
        .with_context(|| format!("Invalid lexicon entry: {word:?}"))
}
