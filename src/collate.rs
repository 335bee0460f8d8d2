use std::cmp::Ordering;

use icu_collator::{AlternateHandling, Collator, CollatorError, CollatorOptions, Strength};

/// Root-locale Unicode collation for normalized headwords.
///
/// Tertiary strength with non-ignorable punctuation, so spaces, hyphens and
/// reconstruction asterisks take part in the order. Strings the collator
/// considers equal fall back to code point order, which keeps the order
/// total.
pub struct Collation {
    collator: Collator,
}

impl Collation {
    pub fn root() -> Result<Self, CollatorError> {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Tertiary);
        options.alternate_handling = Some(AlternateHandling::NonIgnorable);
        let collator = Collator::try_new(&Default::default(), options)?;
        Ok(Self { collator })
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b).then_with(|| a.cmp(b))
    }
}
