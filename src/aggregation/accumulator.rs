use std::collections::{BTreeMap, HashMap};

use crate::models::{DailyUsage, FlowCounts};

/// Running totals for one normalized email.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAccumulator {
    pub total_events: u64,
    /// Sum of capped daily estimates, unrounded.
    pub total_time_minutes: f64,
    pub flows: FlowCounts,
    pub daily_data: BTreeMap<String, DailyUsage>,
}

/// Accumulators keyed by normalized email, iterated in first-seen order.
///
/// Organization and user ordering in the snapshot follows this order, so a
/// plain `HashMap` is not enough.
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulators {
    entries: Vec<(String, UserAccumulator)>,
    index: HashMap<String, usize>,
}

impl UsageAccumulators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, email: &str) -> Option<&UserAccumulator> {
        self.index.get(email).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, email: &str) -> Option<&mut UserAccumulator> {
        match self.index.get(email) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Returns the accumulator for `email`, creating an empty one on first sight.
    pub fn get_or_insert(&mut self, email: &str) -> &mut UserAccumulator {
        let i = match self.index.get(email) {
            Some(&i) => i,
            None => {
                self.entries
                    .push((email.to_string(), UserAccumulator::default()));
                let i = self.entries.len() - 1;
                self.index.insert(email.to_string(), i);
                i
            }
        };
        &mut self.entries[i].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UserAccumulator)> {
        self.entries.iter().map(|(email, acc)| (email.as_str(), acc))
    }
}

impl<'a> IntoIterator for &'a UsageAccumulators {
    type Item = (&'a str, &'a UserAccumulator);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
