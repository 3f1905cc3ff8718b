//! Async convenience API built on top of the sync generator.
//!
//! Batch generation is bounded CPU work with no internal await points;
//! these wrappers exist so async hosts can call it without touching the
//! sync types directly.

use std::collections::HashSet;

use crate::{Entry, PoolGen, Template, TemplateError};

/// Generate a batch in async contexts.
pub async fn async_generate(
    template: &str,
    count: usize,
    name_prefix: &str,
    density: f64,
) -> Result<Vec<Entry>, TemplateError> {
    let template = Template::parse(template)?;
    Ok(PoolGen::new(template, density, name_prefix).generate(count))
}

/// Generate a batch against an exclusion set in async contexts.
pub async fn async_generate_excluding(
    template: &str,
    count: usize,
    name_prefix: &str,
    density: f64,
    exclusions: &HashSet<String>,
) -> Result<Vec<Entry>, TemplateError> {
    let template = Template::parse(template)?;
    Ok(PoolGen::new(template, density, name_prefix).generate_excluding(count, exclusions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_DENSITY, value_set};
    use futures::executor::block_on;

    #[test]
    fn async_generate_matches_template() {
        let batch = block_on(async_generate("05______1_", 4, "X", DEFAULT_DENSITY)).unwrap();
        assert_eq!(batch.len(), 4);
        assert!(batch.iter().all(|e| e.value.starts_with("05")));
        assert!(batch.iter().all(|e| e.value.as_bytes()[8] == b'1'));
    }

    #[test]
    fn async_generate_rejects_bad_template() {
        let result = block_on(async_generate("05", 4, "X", DEFAULT_DENSITY));
        assert!(matches!(result, Err(TemplateError::InvalidLength(2))));
    }

    #[test]
    fn async_excluding_skips_prior_batch() {
        let first = block_on(async_generate("0000000__0", 8, "X", 1.0)).unwrap();
        let seen = value_set(&first);

        let second =
            block_on(async_generate_excluding("0000000__0", 8, "X", 1.0, &seen)).unwrap();
        assert_eq!(second.len(), 8);
        assert!(second.iter().all(|e| !seen.contains(&e.value)));
    }
}
