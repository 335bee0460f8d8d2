/// Lowercases text for comparison under the Turkish casing rules.
///
/// `İ` folds to `i` and `I` folds to the dotless `ı`; everything else goes
/// through the generic Unicode lowercase mapping. The generic mapping alone
/// would turn `I` into `i` and `İ` into `i̇` (with a combining dot), which
/// collapses the dotted/dotless pair.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            'İ' => out.push('i'),
            'I' => out.push('ı'),
            other => out.extend(other.to_lowercase()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_and_dotless_capitals_stay_distinct() {
        assert_eq!(normalize("İ"), "i");
        assert_eq!(normalize("I"), "ı");
        assert_ne!(normalize("İ"), normalize("I"));
        assert_eq!(normalize("IĞDIR"), "ığdır");
        assert_eq!(normalize("İSTANBUL"), "istanbul");
    }

    #[test]
    fn lowercase_input_is_untouched() {
        for word in ["agız", "*agïŕ", "ığdır", "kapsa-", "öküz"] {
            assert_eq!(normalize(word), word);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for word in ["AĞIZ", "İnce", "Işık", "*BOGUŔ", "ÇÖL", "Straße", "ΣΟΦΙΑ", ""] {
            let once = normalize(word);
            assert_eq!(normalize(&once), once, "{word:?}");
        }
    }

    #[test]
    fn case_variants_converge() {
        assert_eq!(normalize("Ağız"), normalize("AĞIZ"));
        assert_eq!(normalize("ağız"), normalize("AĞIZ"));
        assert_eq!(normalize("Kāp"), "kāp");
    }
}
