//! Letter pool: draws round letters without repeats until the alphabet runs out.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, instrument};

/// Letters a round can be played on.
pub const ALPHABET: [char; 26] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Tracks which letters a session has already used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LetterPool {
    used: BTreeSet<char>,
}

impl LetterPool {
    /// Creates a pool with every letter available.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws a letter uniformly from the unused ones.
    ///
    /// Once all 26 letters are used the pool starts over, so long sessions
    /// repeat letters instead of failing.
    #[instrument(skip(self, rng), fields(used = self.used.len()))]
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> char {
        if self.used.len() >= ALPHABET.len() {
            debug!("Letter pool exhausted, starting over");
            self.used.clear();
        }
        let remaining: Vec<char> = ALPHABET
            .iter()
            .copied()
            .filter(|letter| !self.used.contains(letter))
            .collect();
        let letter = remaining.choose(rng).copied().unwrap_or('A');
        self.used.insert(letter);
        debug!(letter = %letter, "Drew letter");
        letter
    }

    /// Letters handed out so far.
    pub fn used(&self) -> &BTreeSet<char> {
        &self.used
    }

    /// Makes every letter available again.
    pub fn reset(&mut self) {
        self.used.clear();
    }
}
