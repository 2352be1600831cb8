use std::collections::BTreeMap;

use crate::Value;

/// Option label → number of current votes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tally(BTreeMap<String, u64>);

impl Tally {
    /// Zero count for every option
    pub fn for_options<I, L>(options: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self(options.into_iter().map(|o| (o.into(), 0)).collect())
    }

    pub fn from_counts(counts: BTreeMap<String, u64>) -> Self {
        Self(counts)
    }

    /// Count for `option`; absent keys read as 0
    pub fn get(
        &self,
        option: &str,
    ) -> u64 {
        self.0.get(option).copied().unwrap_or(0)
    }

    pub fn contains(
        &self,
        option: &str,
    ) -> bool {
        self.0.contains_key(option)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, u64> {
        &self.0
    }

    /// Explicit option add: the only way a key is created at zero.
    /// An existing count is kept.
    pub fn add_option(
        &self,
        option: &str,
    ) -> Self {
        let mut next = self.clone();
        next.0.entry(option.to_string()).or_insert(0);
        next
    }

    pub fn remove_option(
        &self,
        option: &str,
    ) -> Self {
        let mut next = self.clone();
        next.0.remove(option);
        next
    }

    /// Moves the count of `old` to `new`, overwriting any count under `new`.
    pub fn rename_option(
        &self,
        old: &str,
        new: &str,
    ) -> Self {
        let mut next = self.clone();
        if let Some(count) = next.0.remove(old) {
            next.0.insert(new.to_string(), count);
        }
        next
    }
}

impl From<&Tally> for Value {
    fn from(tally: &Tally) -> Self {
        Value::Map(
            tally
                .0
                .iter()
                .map(|(k, v)| (k.clone(), Value::UInt(*v)))
                .collect(),
        )
    }
}

/// Moves one vote from `from` to `to`.
///
/// - decrementing a missing or zero-valued key leaves it at 0 (or absent);
///   counts never go negative and decrements never create keys
/// - incrementing a missing key starts it at 1
/// - `from == to` is a no-op
pub fn apply_delta(
    tally: &Tally,
    from: Option<&str>,
    to: Option<&str>,
) -> Tally {
    let mut next = tally.clone();
    if from.is_some() && from == to {
        return next;
    }

    if let Some(option) = from {
        if let Some(count) = next.0.get_mut(option) {
            *count = count.saturating_sub(1);
        }
    }
    if let Some(option) = to {
        *next.0.entry(option.to_string()).or_insert(0) += 1;
    }

    next
}
