// Positive rewrites and constructive suggestions.
//
// rewrite() swaps each toxic lexicon word for a random positive synonym and
// tidies the result into a sentence. When nothing substitutable matched it
// returns a stock compliment instead of echoing the input. Emoji signals have
// no synonyms and are never substituted directly.
//
// Every picker takes the random source as a parameter so tests can seed it.

use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Captures;

use crate::decision::Classification;
use crate::lexicon::{strip_emoji, Lexicon};

/// Positive replacements per lexicon word.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("hate", &["love", "adore", "appreciate", "cherish"]),
    ("kill", &["help", "support", "uplift", "encourage"]),
    ("die", &["thrive", "flourish", "shine", "grow"]),
    ("idiot", &["genius", "friend", "star", "champ"]),
    ("stupid", &["intelligent", "smart", "brilliant", "clever"]),
    ("dumb", &["bright", "sharp", "wise", "insightful"]),
    ("fool", &["sage", "friend", "thinker", "scholar"]),
    ("moron", &["genius", "mastermind", "visionary", "whiz"]),
    ("ugly", &["beautiful", "lovely", "charming", "gorgeous"]),
    ("disgusting", &["delightful", "pleasant", "wonderful", "appealing"]),
    ("terrible", &["wonderful", "great", "fantastic", "marvelous"]),
    ("awful", &["awesome", "amazing", "fabulous", "splendid"]),
    ("horrible", &["lovely", "excellent", "superb", "terrific"]),
    ("worst", &["best", "finest", "greatest", "top"]),
    ("bad", &["good", "great", "nice", "fine"]),
    ("useless", &["helpful", "valuable", "useful", "worthwhile"]),
    ("loser", &["winner", "champion", "hero", "achiever"]),
    ("pathetic", &["inspiring", "admirable", "impressive", "remarkable"]),
    ("trash", &["treasure", "gem", "gold", "delight"]),
    ("shut up", &["speak up", "tell me more", "go on", "share more"]),
];

/// Returned when there is nothing to substitute.
const COMPLIMENTS: &[&str] = &[
    "You're doing great! \u{1F31F}",
    "Thanks for sharing your thoughts! \u{1F60A}",
    "Have a wonderful day! \u{2600}\u{FE0F}",
    "I appreciate your perspective! \u{1F64C}",
    "Your kindness makes a difference! \u{1F496}",
    "Keep up the amazing work! \u{1F680}",
];

const OFFENSIVE_SUGGESTIONS: &[&str] = &[
    "Consider rephrasing this in a more constructive way.",
    "Try focusing on the idea rather than the person.",
    "A calmer tone will help your point land.",
    "Could you express this more respectfully?",
];

const TOXIC_SUGGESTIONS: &[&str] = &[
    "Let's keep the conversation respectful and kind.",
    "Try expressing your frustration without insults.",
    "Words have impact. Consider a more positive approach.",
    "Focus on what you'd like to see change instead.",
    "Constructive feedback goes further than harsh words.",
];

fn synonyms_for(word: &str) -> Option<&'static [&'static str]> {
    SYNONYMS
        .iter()
        .find(|(entry, _)| *entry == word)
        .map(|(_, pool)| *pool)
}

fn pick<'a, R: Rng + ?Sized>(pool: &[&'a str], rng: &mut R) -> &'a str {
    pool.choose(rng).copied().unwrap_or_default()
}

/// A short constructive-dialogue prompt; nothing for neutral messages.
pub fn suggest<R: Rng + ?Sized>(classification: Classification, rng: &mut R) -> Option<String> {
    let pool = match classification {
        Classification::Neutral => return None,
        Classification::Offensive => OFFENSIVE_SUGGESTIONS,
        Classification::Toxic => TOXIC_SUGGESTIONS,
    };
    Some(pick(pool, rng).to_string())
}

/// A random compliment, optionally without its emoji.
pub fn compliment<R: Rng + ?Sized>(strip: bool, rng: &mut R) -> String {
    let phrase = pick(COMPLIMENTS, rng);
    if strip {
        strip_emoji(phrase).trim().to_string()
    } else {
        phrase.to_string()
    }
}

pub struct RewriteGenerator {
    lexicon: Arc<Lexicon>,
}

impl RewriteGenerator {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    /// Produce a non-toxic alternative to `text`.
    pub fn rewrite<R: Rng + ?Sized>(
        &self,
        text: &str,
        signals: &[String],
        strip: bool,
        rng: &mut R,
    ) -> String {
        if signals.is_empty() {
            return compliment(strip, rng);
        }

        let lowered = text.to_lowercase();
        let mut rewritten = lowered.clone();
        for signal in signals {
            let (Some(pattern), Some(pool)) =
                (self.lexicon.word_pattern(signal), synonyms_for(signal))
            else {
                continue;
            };
            rewritten = pattern
                .replace_all(&rewritten, |_: &Captures<'_>| pick(pool, &mut *rng))
                .into_owned();
        }

        if rewritten == lowered {
            return compliment(strip, rng);
        }

        // Strip before capitalizing so a leading emoji doesn't leave the
        // sentence lowercase with a stray leading space.
        let rewritten = if strip {
            strip_emoji(&rewritten)
        } else {
            rewritten
        };
        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            return compliment(strip, rng);
        }

        punctuate(&capitalize(rewritten))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn punctuate(text: &str) -> String {
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{contains_any_emoji, TOXIC_WORDS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use regex::Regex;

    fn generator() -> RewriteGenerator {
        RewriteGenerator::new(Arc::new(Lexicon::builtin().unwrap()))
    }

    fn signals(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_every_lexicon_word_has_synonyms() {
        for word in TOXIC_WORDS {
            let pool = synonyms_for(word).unwrap_or_else(|| panic!("no synonyms for {word}"));
            assert!(!pool.is_empty());
        }
    }

    #[test]
    fn test_no_pool_reintroduces_a_lexicon_word() {
        let lexicon = Lexicon::builtin().unwrap();
        let phrases = SYNONYMS
            .iter()
            .flat_map(|(_, pool)| pool.iter())
            .chain(COMPLIMENTS)
            .chain(OFFENSIVE_SUGGESTIONS)
            .chain(TOXIC_SUGGESTIONS);
        for phrase in phrases {
            assert!(
                lexicon.find_signals(phrase).is_empty(),
                "{phrase:?} contains a toxic signal"
            );
        }
    }

    #[test]
    fn test_stupid_scenario() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = generator().rewrite("you are so stupid", &signals(&["stupid"]), false, &mut rng);
        let expected = ["intelligent", "smart", "brilliant", "clever"]
            .map(|w| format!("You are so {w}."));
        assert!(expected.contains(&out), "unexpected rewrite: {out}");
    }

    #[test]
    fn test_every_occurrence_substituted_case_insensitively() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = generator().rewrite("Bad day, BAD mood", &signals(&["bad"]), false, &mut rng);
        assert!(!Regex::new(r"(?i)\bbad\b").unwrap().is_match(&out), "{out}");
        assert!(out.ends_with('.'));
        assert!(out.starts_with(|c: char| c.is_uppercase()));
    }

    #[test]
    fn test_existing_terminal_punctuation_kept() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = generator().rewrite("why so dumb?", &signals(&["dumb"]), false, &mut rng);
        assert!(out.ends_with('?') && !out.ends_with("?."), "{out}");
        assert!(out.starts_with("Why so "));
    }

    #[test]
    fn test_no_signals_returns_compliment_not_input() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let out = generator().rewrite("hello there", &[], false, &mut rng);
            assert!(!out.is_empty());
            assert_ne!(out, "hello there");
            assert!(COMPLIMENTS.contains(&out.as_str()));
        }
    }

    #[test]
    fn test_emoji_only_signals_fall_back_to_compliment() {
        let mut rng = StdRng::seed_from_u64(5);
        let out = generator().rewrite("\u{1F595}", &signals(&["\u{1F595}"]), false, &mut rng);
        assert!(COMPLIMENTS.contains(&out.as_str()), "{out}");
    }

    #[test]
    fn test_strip_emoji_output_has_no_emoji() {
        let mut rng = StdRng::seed_from_u64(9);
        let gen = generator();
        let inputs = [
            ("\u{1F621}\u{1F4A9}\u{1F595}", signals(&["\u{1F595}", "\u{1F4A9}", "\u{1F621}"])),
            ("\u{1F600}\u{1F680}", Vec::new()),
            ("stupid \u{1F621}\u{1F44D}\u{1F3FD}", signals(&["stupid", "\u{1F621}"])),
        ];
        for (text, sigs) in inputs {
            for _ in 0..10 {
                let out = gen.rewrite(text, &sigs, true, &mut rng);
                assert!(!contains_any_emoji(&out), "emoji left in {out:?}");
                assert!(!out.contains('\u{FE0F}'));
                assert!(!out.is_empty());
            }
        }
    }

    #[test]
    fn test_strip_keeps_words_and_punctuates() {
        let mut rng = StdRng::seed_from_u64(2);
        let out = generator().rewrite(
            "you are trash \u{1F92E}",
            &signals(&["trash", "\u{1F92E}"]),
            true,
            &mut rng,
        );
        assert!(out.starts_with("You are "), "{out}");
        assert!(out.ends_with('.'));
        assert!(!out.contains("trash"));
    }

    #[test]
    fn test_strip_leading_emoji_capitalizes_first_word() {
        let mut rng = StdRng::seed_from_u64(5);
        let out = generator().rewrite(
            "\u{1F621} you idiot",
            &signals(&["idiot", "\u{1F621}"]),
            true,
            &mut rng,
        );
        let friendly = ["genius", "friend", "star", "champ"].map(|w| format!("You {w}."));
        assert!(friendly.contains(&out), "{out:?}");
    }

    #[test]
    fn test_same_seed_same_output() {
        let gen = generator();
        let sigs = signals(&["hate", "ugly"]);
        let a = gen.rewrite("I hate ugly code", &sigs, false, &mut StdRng::seed_from_u64(42));
        let b = gen.rewrite("I hate ugly code", &sigs, false, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_suggest_pools() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(suggest(Classification::Neutral, &mut rng).is_none());
        let offensive = suggest(Classification::Offensive, &mut rng).unwrap();
        assert!(OFFENSIVE_SUGGESTIONS.contains(&offensive.as_str()));
        let toxic = suggest(Classification::Toxic, &mut rng).unwrap();
        assert!(TOXIC_SUGGESTIONS.contains(&toxic.as_str()));
    }

    #[test]
    fn test_capitalize_and_punctuate() {
        assert_eq!(capitalize("ärger"), "Ärger");
        assert_eq!(capitalize(""), "");
        assert_eq!(punctuate("done!"), "done!");
        assert_eq!(punctuate("done"), "done.");
    }
}
