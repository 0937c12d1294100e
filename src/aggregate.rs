//! Reduction of a bag of per-endpoint errors to a single diagnostic.

use std::collections::HashMap;
use std::hash::Hash;

/// Returns the most frequent error in `errors`, or `None` for an empty slice.
///
/// Errors are counted by value equality. The winner changes only when a count
/// strictly exceeds the current maximum, so among equally frequent errors the
/// one that reached that count first is kept.
pub fn dominant<E: Eq + Hash>(errors: &[E]) -> Option<&E> {
    let mut counts: HashMap<&E, usize> = HashMap::with_capacity(errors.len());
    let mut best: Option<(&E, usize)> = None;

    for error in errors {
        let count = counts.entry(error).or_insert(0);
        *count += 1;

        if best.map_or(true, |(_, max)| *count > max) {
            best = Some((error, *count));
        }
    }

    best.map(|(error, _)| error)
}
