/// Words longer than this get a looser fuzzy-match budget
const LONG_WORD_CHARS: usize = 5;

/// Lower-case `text`, drop punctuation and underscores, and split on whitespace.
///
/// Anything that is neither alphanumeric nor whitespace counts as punctuation,
/// so `"Don't stop_now!"` becomes `["dont", "stopnow"]`.
pub fn normalize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned.split_whitespace().map(str::to_owned).collect()
}

/// Levenshtein distance between two tokens, counted in chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in table[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let substitution = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + substitution);
        }
    }

    table[a.len()][b.len()]
}

/// How many edits a spoken word may be away from `target` and still count.
pub fn allowed_edits(target: &str) -> usize {
    if target.chars().count() > LONG_WORD_CHARS {
        2
    } else {
        1
    }
}

pub fn is_fuzzy_match(target: &str, candidate: &str) -> bool {
    target == candidate || edit_distance(target, candidate) <= allowed_edits(target)
}
