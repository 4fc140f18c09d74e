// ============================================================
// Layer 4 — Stratified Sampler
// ============================================================
// Splits the complaint rows into two disjoint sets:
//   - kept:     indexed into the knowledge base
//   - held_out: set aside for evaluation
//
// Each label value (e.g. each Product) is split on its own so
// that rare categories keep their share in both sets. For a
// group of n rows, round(n * held_out_fraction) are held out.
//
// The choice inside a group is uniformly random from a StdRng
// seeded by the caller. Groups are visited in sorted label
// order, so the same seed always reproduces the same split.
//
// Reference: rand crate documentation (seq::index::sample)

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet};

use crate::domain::error::{RagError, Result};

/// The two halves of a split. Both keep the input order.
#[derive(Debug, Clone)]
pub struct SampleSplit<T> {
    pub kept:     Vec<T>,
    pub held_out: Vec<T>,
}

impl<T> SampleSplit<T> {
    pub fn total(&self) -> usize {
        self.kept.len() + self.held_out.len()
    }
}

/// Stratified split on the label returned by `label_of`.
///
/// Fails with a configuration error when the fraction is outside (0, 1),
/// when a record has no label, or when a label occurs only once.
pub fn stratified_split<T, F>(
    records:           Vec<T>,
    label_of:          F,
    held_out_fraction: f64,
    seed:              u64,
) -> Result<SampleSplit<T>>
where
    F: Fn(&T) -> Option<&str>,
{
    check_fraction(held_out_fraction)?;
    let held_idx = stratified_indices(&records, label_of, held_out_fraction, seed)?;
    Ok(partition(records, &held_idx))
}

fn stratified_indices<T, F>(
    records:  &[T],
    label_of: F,
    fraction: f64,
    seed:     u64,
) -> Result<HashSet<usize>>
where
    F: Fn(&T) -> Option<&str>,
{
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let label = label_of(record).ok_or_else(|| {
            RagError::config(format!("record #{idx} has no value for the stratification label"))
        })?;
        groups.entry(label).or_default().push(idx);
    }

    if let Some((label, members)) = groups.iter().find(|(_, m)| m.len() < 2) {
        return Err(RagError::config(format!(
            "label '{label}' has only {} record(s); stratification needs at least 2 per label",
            members.len()
        )));
    }

    let mut rng      = StdRng::seed_from_u64(seed);
    let mut held_idx = HashSet::new();

    for (label, members) in &groups {
        let take   = allocation(members.len(), fraction);
        let chosen = rand::seq::index::sample(&mut rng, members.len(), take);
        held_idx.extend(chosen.iter().map(|i| members[i]));

        tracing::debug!("Label '{}': {} held out of {}", label, take, members.len());
    }

    Ok(held_idx)
}

/// Unstratified split with the same seed semantics. Used when a caller
/// chooses to fall back after `stratified_split` rejects a singleton label.
pub fn random_split<T>(records: Vec<T>, held_out_fraction: f64, seed: u64) -> Result<SampleSplit<T>> {
    check_fraction(held_out_fraction)?;

    let mut order: Vec<usize> = (0..records.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let take     = allocation(records.len(), held_out_fraction);
    let held_idx = order.into_iter().take(take).collect::<HashSet<_>>();

    Ok(partition(records, &held_idx))
}

fn check_fraction(fraction: f64) -> Result<()> {
    if fraction > 0.0 && fraction < 1.0 {
        Ok(())
    } else {
        Err(RagError::config(format!(
            "held-out fraction must be strictly between 0 and 1, got {fraction}"
        )))
    }
}

/// round(n * fraction), clamped to the group.
fn allocation(group_size: usize, fraction: f64) -> usize {
    ((group_size as f64) * fraction).round().min(group_size as f64) as usize
}

fn partition<T>(records: Vec<T>, held_idx: &HashSet<usize>) -> SampleSplit<T> {
    let mut kept     = Vec::with_capacity(records.len() - held_idx.len());
    let mut held_out = Vec::with_capacity(held_idx.len());

    for (idx, record) in records.into_iter().enumerate() {
        if held_idx.contains(&idx) {
            held_out.push(record);
        } else {
            kept.push(record);
        }
    }

    SampleSplit { kept, held_out }
}
