//! Template validation and parsing.
//!
//! Format: 10 symbols, each a literal digit `0`-`9` or the `_` wildcard.
//!
//! Literal digits are copied into every generated value at the same
//! position; wildcard slots are filled by the generator. A template must
//! contain at least one wildcard, otherwise it denotes a single fixed
//! value and there is nothing to generate.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Required template length in symbols.
pub const TEMPLATE_LEN: usize = 10;
/// Symbol marking a slot the generator fills.
pub const WILDCARD: char = '_';

/// Errors that can occur during template validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template is empty")]
    EmptyTemplate,
    #[error("Invalid template length: {0} (expected 10)")]
    InvalidLength(usize),
    #[error("Invalid template characters: {0}")]
    InvalidCharacters(String),
    #[error("Template has no wildcard slots")]
    NoWildcards,
}

static VALUE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").unwrap());

fn build_value_pattern(template: &str) -> Regex {
    let mut pattern = String::with_capacity(TEMPLATE_LEN * 5 + 2);
    pattern.push('^');
    for symbol in template.chars() {
        if symbol == WILDCARD {
            pattern.push_str("[0-9]");
        } else {
            pattern.push(symbol);
        }
    }
    pattern.push('$');
    Regex::new(&pattern).unwrap()
}

/// Validate a template string.
///
/// Checks run in order and stop at the first failure: non-empty, exact
/// length, character set, at least one wildcard. The character-set error
/// carries every offending symbol once, in first-seen order.
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    if template.is_empty() {
        return Err(TemplateError::EmptyTemplate);
    }

    let len = template.chars().count();
    if len != TEMPLATE_LEN {
        return Err(TemplateError::InvalidLength(len));
    }

    let mut offending = String::new();
    for symbol in template.chars() {
        if !symbol.is_ascii_digit() && symbol != WILDCARD && !offending.contains(symbol) {
            offending.push(symbol);
        }
    }
    if !offending.is_empty() {
        return Err(TemplateError::InvalidCharacters(offending));
    }

    if !template.contains(WILDCARD) {
        return Err(TemplateError::NoWildcards);
    }

    Ok(())
}

/// Check a bare value string: exactly ten decimal digits.
pub fn is_valid_value(value: &str) -> bool {
    VALUE_PATTERN.is_match(value)
}

/// A validated template with its derived slot data.
#[derive(Debug, Clone)]
pub struct Template {
    raw: String,
    slots: Vec<usize>,
    pattern: Regex,
}

impl Template {
    /// Parse and validate a template string.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        validate_template(raw)?;

        // Validation guarantees ASCII, so byte and char positions agree.
        let slots: Vec<usize> = raw
            .char_indices()
            .filter(|&(_, symbol)| symbol == WILDCARD)
            .map(|(position, _)| position)
            .collect();
        let pattern = build_value_pattern(raw);

        Ok(Self {
            raw: raw.to_string(),
            slots,
            pattern,
        })
    }

    /// The original pattern string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of wildcard slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Positions of the wildcard slots, left to right.
    pub fn slot_positions(&self) -> &[usize] {
        &self.slots
    }

    /// Number of distinct values this template spans (10^slots).
    pub fn space_size(&self) -> u64 {
        10_u64.pow(self.slots.len() as u32)
    }

    /// Whether a value could have been produced from this template.
    pub fn matches(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }

    /// Splice one digit per slot into the pattern, yielding a full value.
    ///
    /// `digits` must hold exactly one digit in `0..=9` per slot.
    pub fn render(&self, digits: &[u8]) -> String {
        debug_assert_eq!(digits.len(), self.slots.len());

        let mut bytes: Vec<u8> = self.raw.bytes().collect();
        for (&position, &digit) in self.slots.iter().zip(digits.iter()) {
            bytes[position] = b'0' + digit;
        }
        bytes.into_iter().map(char::from).collect()
    }
}
