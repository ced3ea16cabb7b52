//! German-style string collation
//!
//! Strings are compared in three levels: base letters (case and accents
//! folded, `ß` expands to `ss`), then accents (unaccented first), then case
//! (uppercase first). Remaining ties fall back to code point order so the
//! ordering is total.
//!
//! At the base level characters are grouped as in the German locale tables:
//! whitespace, then punctuation and symbols, then digits, then letters.
//! Inside the punctuation group the order is by code point, which is coarser
//! than the locale's own symbol order.

use std::cmp::Ordering;

/// Compare two strings: base letters, then accents, then uppercase-first case
pub fn compare(a: &str, b: &str) -> Ordering {
    compare_ignore_case(a, b)
        .then_with(|| case_weights(a).cmp(&case_weights(b)))
        .then_with(|| a.cmp(b))
}

/// Compare two strings ignoring case but not accents
pub fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| accent_weights(a).cmp(&accent_weights(b)))
}

fn primary_key(s: &str) -> Vec<(u8, char)> {
    let mut key = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'ß' => key.extend([(LETTER, 's'), (LETTER, 's')]),
            _ => key.push((group(c), base_letter(c))),
        }
    }
    key
}

const WHITESPACE: u8 = 0;
const SYMBOL: u8 = 1;
const DIGIT: u8 = 2;
const LETTER: u8 = 3;

fn group(c: char) -> u8 {
    if c.is_whitespace() {
        WHITESPACE
    } else if c.is_numeric() {
        DIGIT
    } else if c.is_alphabetic() {
        LETTER
    } else {
        SYMBOL
    }
}

fn accent_weights(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| u8::from(c == 'ß' || base_letter(c) != lower(c)))
        .collect()
}

fn case_weights(s: &str) -> Vec<u8> {
    s.chars().map(|c| u8::from(!c.is_uppercase())).collect()
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn base_letter(c: char) -> char {
    match lower(c) {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_sorts_first() {
        assert_eq!(compare("A", "a"), Ordering::Less);
        assert_eq!(compare("Zebra", "zebra"), Ordering::Less);
    }

    #[test]
    fn test_letters_before_case() {
        // case only matters when base letters tie
        assert_eq!(compare("a", "B"), Ordering::Less);
        assert_eq!(compare("b", "A"), Ordering::Greater);
    }

    #[test]
    fn test_umlauts_sort_with_base_letter() {
        assert_eq!(compare("Äpfel", "Apfel"), Ordering::Greater);
        assert_eq!(compare("Äpfel", "Birne"), Ordering::Less);
        assert_eq!(compare("Straße", "Strasse"), Ordering::Greater);
        assert_eq!(compare("Straße", "Strasst"), Ordering::Less);
    }

    #[test]
    fn test_equal_and_prefix() {
        assert_eq!(compare("abc", "abc"), Ordering::Equal);
        assert_eq!(compare("ab", "abc"), Ordering::Less);
    }

    #[test]
    fn test_punctuation_and_digits_before_letters() {
        assert_eq!(compare("~", "a"), Ordering::Less);
        assert_eq!(compare("_x", "Ab"), Ordering::Less);
        assert_eq!(compare("9", "a"), Ordering::Less);
        assert_eq!(compare("-", "0"), Ordering::Less);
        assert_eq!(compare(" z", "!a"), Ordering::Less);
        assert_eq!(compare("a~", "ab"), Ordering::Less);
    }

    #[test]
    fn test_ignore_case() {
        assert_eq!(compare_ignore_case("HALLO", "hallo"), Ordering::Equal);
        assert_ne!(compare_ignore_case("über", "uber"), Ordering::Equal);
    }
}
