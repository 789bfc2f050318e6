//! Fuzzy term expansion.
//!
//! Rather than computing edit distance per candidate, a fuzzy term is
//! expanded up front into every string within distance 1 (or 2) of it.
//! A file matches when it contains any literal from that set.
//!
//! Distance 2 is the distance-1 generator applied to every distance-1
//! variant, so the set grows roughly with the square of
//! `len × alphabet`. Expansions are therefore computed once per run and
//! memoized in a [`FuzzyCache`].

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use std::sync::Arc;

/// Characters used for insertion and substitution.
pub const ALPHABET: [char; 26] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Expands `term` into every variant within `distance` edits.
///
/// The result is sorted, deduplicated and always contains `term` itself.
/// Distances above 2 are treated as 2; distance 0 yields just the term.
#[must_use]
pub fn expand(term: &str, distance: u8) -> Vec<String> {
    let set = match distance {
        0 => std::iter::once(term.to_string()).collect(),
        1 => distance_one(term),
        _ => distance_two(term),
    };

    let mut variants: Vec<String> = set.into_iter().collect();
    variants.sort_unstable();
    variants
}

/// All strings one deletion, insertion, substitution or adjacent
/// transposition away from `term`, plus `term`.
fn distance_one(term: &str) -> AHashSet<String> {
    let chars: Vec<char> = term.chars().collect();
    let len = chars.len();
    let mut out = AHashSet::with_capacity(1 + len + (len + 1) * ALPHABET.len() + len * ALPHABET.len());

    out.insert(term.to_string());

    // Deletion
    for i in 0..len {
        out.insert(splice(&chars, i, i + 1, None));
    }

    // Insertion
    for i in 0..=len {
        for &c in &ALPHABET {
            out.insert(splice(&chars, i, i, Some(c)));
        }
    }

    // Substitution
    for i in 0..len {
        for &c in ALPHABET.iter().filter(|&&c| c != chars[i]) {
            out.insert(splice(&chars, i, i + 1, Some(c)));
        }
    }

    // Transposition
    for i in 1..len {
        let mut swapped = chars.clone();
        swapped.swap(i - 1, i);
        out.insert(swapped.into_iter().collect());
    }

    out
}

fn distance_two(term: &str) -> AHashSet<String> {
    let first: Vec<String> = distance_one(term).into_iter().collect();

    first
        .par_iter()
        .map(|variant| distance_one(variant))
        .reduce(AHashSet::new, |mut acc, set| {
            if acc.len() < set.len() {
                let mut set = set;
                set.extend(acc);
                return set;
            }
            acc.extend(set);
            acc
        })
}

/// Replaces `chars[from..to]` with `insert` and collects into a string.
fn splice(chars: &[char], from: usize, to: usize, insert: Option<char>) -> String {
    let mut s = String::with_capacity(chars.len() + 1);
    s.extend(&chars[..from]);
    if let Some(c) = insert {
        s.push(c);
    }
    s.extend(&chars[to..]);
    s
}

/// Memoized expansions keyed by `(term, distance)`.
///
/// Filled before the match engine starts; read-only afterwards.
#[derive(Default)]
pub struct FuzzyCache {
    entries: AHashMap<(String, u8), Arc<Vec<String>>>,
}

impl FuzzyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the expansion for `term`, computing it on first use.
    pub fn get_or_expand(&mut self, term: &str, distance: u8) -> Arc<Vec<String>> {
        let key = (term.to_string(), distance);
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit);
        }

        let start = std::time::Instant::now();
        let variants = Arc::new(expand(term, distance));
        tracing::debug!(
            "expanded {term:?} at distance {distance} into {} variants in {:?}",
            variants.len(),
            start.elapsed()
        );
        self.entries.insert(key, Arc::clone(&variants));
        variants
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
