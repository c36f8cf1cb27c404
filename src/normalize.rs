//! Answer canonicalization and forfeit detection.
//!
//! Guesses and accepted answers are reduced to a canonical form before
//! comparison so that casing, articles, and stray punctuation do not cost
//! anyone a guess.

const STOP_WORDS: [&str; 4] = ["a", "an", "the", "and"];

const STRIP_CHARS: [char; 19] = [
    '\'', '\u{2019}', '-', ',', '.', '?', '!', '"', '/', '[', ']', '(', ')', '{', '}', '`', '~',
    ':', ';',
];

const FORFEIT_PHRASES: [&str; 4] = ["i give up", "give up", "giveup", "igiveup"];

/// Reduce an answer string to its canonical comparison form.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let joined = lowered
        .trim()
        .split(' ')
        .filter(|word| !STOP_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ");
    let stripped: String = joined.chars().filter(|c| !STRIP_CHARS.contains(c)).collect();
    stripped.trim().to_string()
}

/// True when the guess canonically matches any accepted answer.
pub fn answers_match(input: &str, accepted: &[String]) -> bool {
    let canonical = normalize(input);
    accepted.iter().any(|a| normalize(a) == canonical)
}

/// True when the guess is a forfeit phrase rather than a real attempt.
///
/// A question whose accepted answer is itself a forfeit phrase takes
/// precedence, so "I give up" can still be a correct answer.
pub fn is_forfeit(input: &str, accepted: &[String]) -> bool {
    if answers_match(input, accepted) {
        return false;
    }
    let lowered = input.trim().to_lowercase();
    FORFEIT_PHRASES.contains(&lowered.as_str())
}
