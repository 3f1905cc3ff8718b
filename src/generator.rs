//! Constrained batch generation of unique template values.
//!
//! Candidates are built by bounded rejection sampling. Each wildcard slot
//! draws random digits until one passes the active constraint profile;
//! a slot that runs out of draws abandons the whole candidate. Finished
//! candidates count only if they are new against the working set, which
//! holds the caller's exclusions plus everything accepted so far.
//!
//! Generation never fails: when the value space or the attempt budget
//! runs out, the batch comes back shorter than requested.

use rand::random_range;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::template::Template;

/// Density used when the caller does not pick one.
pub const DEFAULT_DENSITY: f64 = 0.3;

/// Upper bound of the strict density tier.
const STRICT_MAX: f64 = 0.4;
/// Upper bound of the balanced tier; everything above is loose.
const BALANCED_MAX: f64 = 0.7;
/// Point inside the balanced tier above which adjacency and runs are
/// allowed. Tunable alongside the tier bounds.
const RELAX_CUTOVER: f64 = 0.55;

/// Random draws allowed per slot before a candidate is abandoned.
const MAX_SLOT_DRAWS: usize = 20;
/// Candidate attempts granted per requested value.
const ATTEMPTS_PER_VALUE: usize = 200;
/// Flat attempt allowance on top of the per-value budget.
const BASE_ATTEMPTS: usize = 5000;

/// Naturalness rules derived from a density and the slot count.
///
/// All three rules look only at the slot digits of one candidate; fixed
/// template digits never participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintProfile {
    /// Most often any single digit may appear among the slot digits.
    pub max_repeat: usize,
    /// Whether two consecutive slots may hold the same digit.
    pub allow_adjacent: bool,
    /// Whether three consecutive slots may step up or down by one.
    pub allow_runs: bool,
}

impl ConstraintProfile {
    /// Map a density in `[0.0, 1.0]` to a profile for `slot_count` slots.
    ///
    /// Out-of-range densities are clamped; non-finite ones fall back to
    /// [`DEFAULT_DENSITY`].
    pub fn for_density(density: f64, slot_count: usize) -> Self {
        let tier = if density.is_finite() {
            density.clamp(0.0, 1.0)
        } else {
            DEFAULT_DENSITY
        };

        if tier <= STRICT_MAX {
            Self {
                max_repeat: repeat_cap(slot_count, 0.35),
                allow_adjacent: false,
                allow_runs: false,
            }
        } else if tier <= BALANCED_MAX {
            let relaxed = tier > RELAX_CUTOVER;
            Self {
                max_repeat: repeat_cap(slot_count, 0.6),
                allow_adjacent: relaxed,
                allow_runs: relaxed,
            }
        } else {
            Self {
                max_repeat: slot_count,
                allow_adjacent: true,
                allow_runs: true,
            }
        }
    }

    /// Whether `digit` may follow the digits already placed.
    fn admits(&self, placed: &[u8], digit: u8) -> bool {
        if placed.iter().filter(|&&d| d == digit).count() >= self.max_repeat {
            return false;
        }

        if !self.allow_adjacent && placed.last() == Some(&digit) {
            return false;
        }

        // The first two slots carry no run history.
        if !self.allow_runs && placed.len() >= 2 {
            let a = i16::from(placed[placed.len() - 2]);
            let b = i16::from(placed[placed.len() - 1]);
            let c = i16::from(digit);
            if (b - a == 1 && c - b == 1) || (a - b == 1 && b - c == 1) {
                return false;
            }
        }

        true
    }
}

fn repeat_cap(slot_count: usize, share: f64) -> usize {
    ((slot_count as f64 * share).ceil() as usize).max(2)
}

/// One generated value with its batch bookkeeping fields.
///
/// `id` is the provisional 1-based acceptance index rendered as a string;
/// callers that merge batches renumber entries themselves. `persisted`
/// starts out `false` and is flipped by whoever stores the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub value: String,
    pub name: String,
    pub persisted: bool,
}

/// Batch generator for one template, density and name prefix.
///
/// A generator keeps no mutable state across calls: every call builds its
/// own working set, so repeated or interleaved calls on one instance are
/// independent.
#[derive(Debug, Clone)]
pub struct PoolGen {
    template: Template,
    profile: ConstraintProfile,
    name_prefix: String,
}

impl PoolGen {
    /// Create a generator for a parsed template.
    pub fn new(template: Template, density: f64, name_prefix: impl Into<String>) -> Self {
        let profile = ConstraintProfile::for_density(density, template.slot_count());
        Self {
            template,
            profile,
            name_prefix: name_prefix.into(),
        }
    }

    /// Create a generator with the default density.
    pub fn with_default_density(template: Template, name_prefix: impl Into<String>) -> Self {
        Self::new(template, DEFAULT_DENSITY, name_prefix)
    }

    /// The template this generator fills.
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// The active constraint profile.
    pub fn profile(&self) -> ConstraintProfile {
        self.profile
    }

    /// Generate up to `count` values with no prior exclusions.
    pub fn generate(&self, count: usize) -> Vec<Entry> {
        self.generate_excluding(count, &HashSet::new())
    }

    /// Generate up to `count` values distinct from each other and from
    /// `exclusions`, sorted ascending by value.
    ///
    /// The batch may come back short: the target is capped by the
    /// unclaimed value space, and the attempt budget can run out when the
    /// constraints leave little of that space reachable. Callers compare
    /// the returned length against what they asked for.
    pub fn generate_excluding(&self, count: usize, exclusions: &HashSet<String>) -> Vec<Entry> {
        let achievable = self
            .template
            .space_size()
            .saturating_sub(exclusions.len() as u64);
        let target = u64::min(count as u64, achievable) as usize;
        if target == 0 {
            return Vec::new();
        }

        // Working copy; the caller's set is never modified.
        let mut taken = exclusions.clone();
        let mut entries: Vec<Entry> = Vec::with_capacity(target);
        let max_attempts = target
            .saturating_mul(ATTEMPTS_PER_VALUE)
            .saturating_add(BASE_ATTEMPTS);
        let mut attempts = 0usize;

        while entries.len() < target && attempts < max_attempts {
            attempts += 1;

            let Some(digits) = self.fill_slots() else {
                continue;
            };
            let value = self.template.render(&digits);
            if taken.contains(&value) {
                continue;
            }

            taken.insert(value.clone());
            let seq = entries.len() + 1;
            entries.push(Entry {
                id: seq.to_string(),
                value,
                name: self.entry_name(seq),
                persisted: false,
            });
        }

        entries.sort_by(|a, b| a.value.cmp(&b.value));
        entries
    }

    /// Fill every slot left to right, or give up on the candidate when a
    /// slot exhausts its draws.
    fn fill_slots(&self) -> Option<Vec<u8>> {
        let mut placed: Vec<u8> = Vec::with_capacity(self.template.slot_count());

        'slots: for _ in 0..self.template.slot_count() {
            for _ in 0..MAX_SLOT_DRAWS {
                let digit: u8 = random_range(0..=9);
                if self.profile.admits(&placed, digit) {
                    placed.push(digit);
                    continue 'slots;
                }
            }
            return None;
        }

        Some(placed)
    }

    fn entry_name(&self, seq: usize) -> String {
        if self.name_prefix.is_empty() {
            seq.to_string()
        } else {
            format!("{} {}", self.name_prefix, seq)
        }
    }
}

/// Collect the values of a batch, ready to feed back as the next call's
/// exclusion set.
pub fn value_set(entries: &[Entry]) -> HashSet<String> {
    entries.iter().map(|entry| entry.value.clone()).collect()
}
