//! Text matching helpers shared by ranking and validation.

const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Words too common in tournament names to identify one.
const GENERIC_NAME_WORDS: &[&str] = &[
    "tournoi",
    "tournament",
    "national",
    "regional",
    "régional",
    "international",
    "open",
    "tennis",
    "table",
    "club",
    "ping",
    "pong",
];

/// French name of a month (1-based). Out-of-range months yield `None`.
pub fn french_month(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|idx| FRENCH_MONTHS.get(idx as usize).copied())
}

/// Whether `haystack` contains any of `needles`.
pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Collapse runs of whitespace into single spaces and lowercase.
pub fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Distinctive words of a tournament name, lowercased.
pub fn name_tokens(name: &str) -> Vec<String> {
    fold(name)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 4)
        .filter(|w| !GENERIC_NAME_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Whether folded `text` mentions the tournament called `name`.
///
/// The full name matches outright; otherwise at least half of its
/// distinctive words must appear.
pub fn mentions_name(text: &str, name: &str) -> bool {
    let name = fold(name);
    if name.is_empty() {
        return false;
    }
    if text.contains(&name) {
        return true;
    }
    let tokens = name_tokens(&name);
    if tokens.is_empty() {
        return false;
    }
    let hits = tokens.iter().filter(|t| text.contains(t.as_str())).count();
    hits * 2 >= tokens.len()
}
