//! Levenshtein edit distance.
//!
//! Distances are counted in Unicode scalar values, not bytes.

/// Minimum number of single-character insertions, deletions and
/// substitutions that turn `a` into `b`.
///
/// Only the shorter string is buffered: one row of `min(|a|, |b|) + 1`
/// cells plus its chars. The longer string is streamed.
#[must_use]
pub fn distance(a: &str, b: &str) -> usize {
    let (long, short) = if a.chars().count() >= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short: Vec<char> = short.chars().collect();

    if short.is_empty() {
        return long.chars().count();
    }

    // row[j] = distance(long[..i], short[..j])
    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (i, lc) in long.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &sc) in short.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(lc != sc);
            row[j + 1] = (above + 1).min(row[j] + 1).min(substitution);
            diagonal = above;
        }
    }
    row[short.len()]
}
