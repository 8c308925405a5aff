//! Affirmation Classifier
//!
//! Decides whether a user utterance says "yes" to:
//! - a pending field confirmation ("You said: ... Did I get that right?")
//! - the collected details as a whole, after the signature request

/// Static keyword lists, matched as whole words or word sequences
const FIELD_AFFIRMATIONS: &[&str] = &[
    "yes", "correct", "confirmed", "that's right",
];

const SUMMARY_AFFIRMATIONS: &[&str] = &[
    "yes", "correct", "confirmed", "looks good", "all good",
];

/// Any of these anywhere in the utterance overrides an affirmation
const NEGATIONS: &[&str] = &["not", "incorrect", "wrong", "nope", "isn't"];

/// Only a negation when it opens the utterance ("no, ..." but not "no problem, yes")
const LEADING_NEGATIONS: &[&str] = &["no"];

/// Capability for recognising user intent in a single utterance
pub trait IntentClassifier: Send + Sync {
    /// The user accepts a proposed field value
    fn affirms_field(&self, utterance: &str) -> bool;

    /// The user accepts the collected details
    fn affirms_summary(&self, utterance: &str) -> bool;
}

/// Case-insensitive whole-word matching against fixed keyword sets
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn affirms_field(&self, utterance: &str) -> bool {
        contains_any(utterance, FIELD_AFFIRMATIONS)
    }

    fn affirms_summary(&self, utterance: &str) -> bool {
        contains_any(utterance, SUMMARY_AFFIRMATIONS)
    }
}

fn contains_any(utterance: &str, keywords: &[&str]) -> bool {
    let words = tokenize(utterance);
    if is_negated(&words) {
        return false;
    }
    keywords.iter().any(|kw| contains_phrase(&words, kw))
}

fn is_negated(words: &[String]) -> bool {
    let leading = words
        .first()
        .is_some_and(|w| LEADING_NEGATIONS.contains(&w.as_str()));
    leading || NEGATIONS.iter().any(|kw| contains_phrase(words, kw))
}

/// Lowercased words; apostrophes are kept inside words and curly ones normalised
fn tokenize(utterance: &str) -> Vec<String> {
    utterance
        .to_lowercase()
        .replace('\u{2019}', "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let parts: Vec<&str> = phrase.split_whitespace().collect();
    if parts.is_empty() || parts.len() > words.len() {
        return false;
    }
    words
        .windows(parts.len())
        .any(|window| window.iter().zip(&parts).all(|(w, p)| w == p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_affirmations() {
        let classifier = KeywordIntentClassifier::new();
        let cases = vec![
            "Yes",
            "yes that's it",
            "Correct.",
            "confirmed",
            "That's right",
            "that’s right",
        ];

        for c in cases {
            assert!(classifier.affirms_field(c), "expected affirmation: {}", c);
        }
    }

    #[test]
    fn test_field_rejections() {
        let classifier = KeywordIntentClassifier::new();
        let cases = vec!["no", "nope, it's Jane's Burger Bar", "wrong", "looks good"];

        for c in cases {
            assert!(!classifier.affirms_field(c), "expected rejection: {}", c);
        }
    }

    #[test]
    fn test_summary_affirmations() {
        let classifier = KeywordIntentClassifier::new();
        for c in ["yes", "Correct", "confirmed", "Looks good to me", "all good!"] {
            assert!(classifier.affirms_summary(c), "expected affirmation: {}", c);
        }
        assert!(!classifier.affirms_summary("wait, the zip is wrong"));
        assert!(!classifier.affirms_summary("that's right"));
    }

    #[test]
    fn test_whole_words_only() {
        let classifier = KeywordIntentClassifier::new();
        assert!(!classifier.affirms_field("No, that's incorrect"));
        assert!(!classifier.affirms_field("that's incorrect"));
        assert!(!classifier.affirms_field("not correct"));
        assert!(!classifier.affirms_field("I changed it yesterday"));
        assert!(!classifier.affirms_summary("the zip is not correct"));
        assert!(!classifier.affirms_summary("yes but the email is wrong"));
    }

    #[test]
    fn test_punctuation_and_leading_no() {
        let classifier = KeywordIntentClassifier::new();
        assert!(classifier.affirms_field("Yes!"));
        assert!(classifier.affirms_field("yep... yes, correct"));
        assert!(classifier.affirms_field("That\u{2019}s right."));
        assert!(!classifier.affirms_field("no, yes I mean"));
        assert!(!classifier.affirms_field("No."));
    }
}
