//! Consensus voting over short sliding windows
//!
//! Pure functions over the window contents, so hysteresis decisions can be
//! tested without threading mutable flags through an analyzer.

/// Votes needed for a majority of `window` slots: ceil(window / 2)
#[inline]
pub fn quorum(window: usize) -> usize {
    (window + 1) / 2
}

/// The value holding at least `quorum` votes, if any.
///
/// When several values reach quorum (only possible for even windows) the
/// one with the most votes wins; ties go to the most recent.
pub fn consensus<T, I>(votes: I, quorum: usize) -> Option<T>
where
    T: Copy + PartialEq,
    I: IntoIterator<Item = T>,
{
    let votes: Vec<T> = votes.into_iter().collect();
    let mut best: Option<(T, usize)> = None;

    for (i, &candidate) in votes.iter().enumerate().rev() {
        // Count each distinct value once, at its most recent position
        if votes[i + 1..].contains(&candidate) {
            continue;
        }
        let count = votes.iter().filter(|&&v| v == candidate).count();
        if count >= quorum && best.map_or(true, |(_, c)| count > c) {
            best = Some((candidate, count));
        }
    }

    best.map(|(value, _)| value)
}

/// Fraction of `votes` equal to `target`; `None` for an empty window
pub fn agreement<T, I>(votes: I, target: T) -> Option<f64>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut total = 0usize;
    let mut matching = 0usize;
    for vote in votes {
        total += 1;
        if vote == target {
            matching += 1;
        }
    }
    (total > 0).then(|| matching as f64 / total as f64)
}
