use std::collections::{HashMap, HashSet};

use super::accumulator::{UsageAccumulators, UserAccumulator};
use crate::config::DEFAULT_GENERIC_DOMAINS;

/// Email domains that never form an organization.
#[derive(Debug, Clone)]
pub struct GenericDomains(HashSet<String>);

impl GenericDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.0.contains(domain)
    }
}

impl Default for GenericDomains {
    fn default() -> Self {
        Self::new(DEFAULT_GENERIC_DOMAINS)
    }
}

/// Lower-cased substring after the first `@`, if non-empty.
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.split_once('@')?;
    let domain = domain.trim().to_lowercase();
    (!domain.is_empty()).then_some(domain)
}

/// Users of one domain, borrowed from the accumulator set.
#[derive(Debug)]
pub struct DomainGroup<'a> {
    pub domain: String,
    pub users: Vec<(&'a str, &'a UserAccumulator)>,
}

/// Partitions accumulators by email domain, dropping generic domains.
///
/// Groups come out in first-seen domain order; users within a group keep
/// accumulator order.
pub fn group_by_domain<'a>(
    accumulators: &'a UsageAccumulators,
    generic: &GenericDomains,
) -> Vec<DomainGroup<'a>> {
    let mut groups: Vec<DomainGroup<'a>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut excluded = 0usize;

    for (email, acc) in accumulators.iter() {
        let Some(domain) = email_domain(email) else {
            excluded += 1;
            continue;
        };
        if generic.contains(&domain) {
            excluded += 1;
            continue;
        }

        let i = match positions.get(&domain) {
            Some(&i) => i,
            None => {
                positions.insert(domain.clone(), groups.len());
                groups.push(DomainGroup {
                    domain,
                    users: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[i].users.push((email, acc));
    }

    tracing::debug!(
        organizations = groups.len(),
        excluded,
        "Grouped users by email domain"
    );

    groups
}
