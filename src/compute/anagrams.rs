//! Permutation counting kernel

/// Count permutations of a word as len! (letters treated as distinct)
pub fn anagram_count(word: &str) -> u128 {
    let len = word.chars().count() as u128;
    (1..=len).product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anagram_count() {
        assert_eq!(anagram_count(""), 1);
        assert_eq!(anagram_count("a"), 1);
        assert_eq!(anagram_count("ab"), 2);
        assert_eq!(anagram_count("abcd"), 24);
        assert_eq!(anagram_count("abcdefghij"), 3_628_800);
    }
}
