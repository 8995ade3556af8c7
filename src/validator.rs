//! Answer validation against the letter rule and the category word sets.

use tracing::{instrument, trace};

use crate::words::{WordSetProvider, normalize};

/// Checks a raw answer for `category` against the round's `letter`.
///
/// The answer is trimmed and lower-cased, must start with the lower-cased
/// letter, and must be listed under a known category.
#[instrument(level = "trace", skip(words))]
pub fn validate(words: &dyn WordSetProvider, category: &str, letter: &str, raw: &str) -> bool {
    let Some(value) = normalize(raw) else {
        trace!("Empty answer");
        return false;
    };

    let letter = letter.to_lowercase();
    let Some(initial) = letter.chars().next() else {
        trace!("No target letter");
        return false;
    };
    if !value.starts_with(initial) {
        trace!("Wrong initial letter");
        return false;
    }

    let category = category.to_lowercase();
    if !words.has_category(&category) {
        trace!("Unknown category");
        return false;
    }

    words.contains(&category, &value)
}
