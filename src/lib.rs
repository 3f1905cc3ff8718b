//! numpool: template-driven batches of unique, natural-looking digit strings.
//!
//! A template fixes some of ten positions and leaves the rest as `_`
//! wildcard slots. The generator fills the slots by bounded rejection
//! sampling under a density-derived constraint profile (digit frequency,
//! adjacent duplicates, three-digit runs), keeps every value distinct from
//! the batch and from a caller-supplied exclusion set, and returns the
//! batch sorted ascending by value. Shortfalls degrade silently; the
//! returned length is the only signal.
//!
//! # Format
//!
//! ```text
//! TEMPLATE ::= 10 symbols, each '0'..'9' (fixed) or '_' (slot), >= 1 slot
//! VALUE    ::= 10 digits agreeing with the template at every fixed position
//! ```
//!
//! # Example
//!
//! ```
//! use numpool::{PoolGen, Template};
//!
//! let template = Template::parse("05______1_").expect("valid template");
//! let pool = PoolGen::with_default_density(template, "Lead");
//! let batch = pool.generate(5);
//! assert_eq!(batch.len(), 5);
//! assert!(batch.iter().all(|entry| entry.value.starts_with("05")));
//! ```

mod async_api;
mod generator;
mod template;
mod vcard;

pub use async_api::{async_generate, async_generate_excluding};
pub use generator::{ConstraintProfile, DEFAULT_DENSITY, Entry, PoolGen, value_set};
pub use template::{
    TEMPLATE_LEN, Template, TemplateError, WILDCARD, is_valid_value, validate_template,
};
pub use vcard::{VCARD_VERSION, VcardError, digest, from_vcf, load_vcf, save_vcf, to_vcf};
