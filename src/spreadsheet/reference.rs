//! A1-style cell reference conversion

/// Converts a reference such as `B3` into zero-based `(row, col)` indexes.
/// Absolute markers (`$B$3`) are accepted; anything else yields `None`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}

/// Converts column letters (`A`, `AB`) into a zero-based index
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |index, letter| {
        letter
            .is_ascii_alphabetic()
            .then(|| index * 26 + (letter.to_ascii_uppercase() as usize - 'A' as usize + 1))
    }).map(|index| index - 1)
}

/// Converts a one-based row number into a zero-based index
pub(crate) fn row_to_index(digits: &str) -> Option<usize> {
    digits.parse::<usize>().ok().filter(|row| *row > 0).map(|row| row - 1)
}

/// Converts zero-based indexes into an A1-style reference
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut col = col + 1;
    while col > 0 {
        col -= 1;
        letters.push((b'A' + (col % 26) as u8) as char);
        col /= 26;
    }
    letters.iter().rev().collect::<String>() + &(row + 1).to_string()
}
