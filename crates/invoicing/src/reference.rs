//! Human-readable invoice reference codes.

use rand::Rng;

/// Alphabet for reference codes. Visually confusable characters (0/O, 1/I)
/// are left out so a reference survives being read over the phone.
pub const REFERENCE_ALPHABET: &str = "ABCDEFGHJLMPQRSTUVWYZ23456789";

/// Reference codes are always exactly this long.
pub const REFERENCE_LEN: usize = 6;

/// Draw a fresh reference code.
///
/// Uniqueness is not guaranteed here; the storage layer holds a unique
/// index over references and regenerates on collision.
pub fn generate_reference(rng: &mut impl Rng) -> String {
    let alphabet: Vec<char> = REFERENCE_ALPHABET.chars().collect();
    (0..REFERENCE_LEN)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_six_characters_from_the_alphabet() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let reference = generate_reference(&mut rng);
            assert_eq!(reference.len(), REFERENCE_LEN);
            assert!(reference.chars().all(|c| REFERENCE_ALPHABET.contains(c)));
        }
    }

    #[test]
    fn alphabet_has_no_confusable_characters() {
        for confusable in ['0', 'O', '1', 'I'] {
            assert!(!REFERENCE_ALPHABET.contains(confusable));
        }
        assert_eq!(REFERENCE_ALPHABET.chars().count(), 29);
    }
}
