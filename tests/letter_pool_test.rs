//! Tests for round letter selection.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use letter_rush::{ALPHABET, LetterPool};

#[test]
fn test_first_26_draws_are_distinct() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut pool = LetterPool::new();

    let draws: Vec<char> = (0..27).map(|_| pool.draw(&mut rng)).collect();
    let first: HashSet<char> = draws[..26].iter().copied().collect();
    assert_eq!(first.len(), 26);
    assert!(ALPHABET.contains(&draws[26]));
}

#[test]
fn test_exhausted_pool_starts_over() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut pool = LetterPool::new();
    for _ in 0..26 {
        pool.draw(&mut rng);
    }
    assert_eq!(pool.used().len(), 26);

    let letter = pool.draw(&mut rng);
    assert_eq!(pool.used().len(), 1);
    assert!(pool.used().contains(&letter));
}

#[test]
fn test_reset_makes_every_letter_available() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut pool = LetterPool::new();
    let letter = pool.draw(&mut rng);
    assert!(pool.used().contains(&letter));

    pool.reset();
    assert!(pool.used().is_empty());
}

#[test]
fn test_draws_are_uppercase_letters() {
    let mut rng = rand::rng();
    let mut pool = LetterPool::new();
    for _ in 0..52 {
        assert!(pool.draw(&mut rng).is_ascii_uppercase());
    }
}
