use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{Payload, SearchResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultGroup {
    /// Empty for the unlabeled bucket.
    pub label: String,
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupedResults {
    pub groups: Vec<ResultGroup>,
    #[serde(default)]
    ranked: Vec<SearchResult>,
}

impl GroupedResults {
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Results in display order: group by group. Across groups this is not
    /// score order; see [`GroupedResults::ranked`].
    pub fn iter(&self) -> impl Iterator<Item = &SearchResult> {
        self.groups.iter().flat_map(|group| group.results.iter())
    }

    /// Every result in rank order, ignoring groups.
    pub fn ranked(&self) -> &[SearchResult] {
        &self.ranked
    }

    /// Highest-ranked result overall.
    pub fn best(&self) -> Option<&SearchResult> {
        self.ranked.first()
    }
}

/// Merges candidate streams, drops duplicate payloads, ranks, truncates to
/// `max_results` and partitions by group label.
///
/// Ranking is score descending, then [`crate::model::ResultType::priority`],
/// then stream order. Groups appear in the order of their best result.
pub fn aggregate(streams: Vec<Vec<SearchResult>>, max_results: usize) -> GroupedResults {
    let mut ranked: Vec<SearchResult> = streams.into_iter().flatten().collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.result_type.priority().cmp(&b.result_type.priority()))
    });

    let mut seen: HashSet<Payload> = HashSet::new();
    ranked.retain(|result| seen.insert(result.payload.clone()));
    ranked.truncate(max_results);

    let mut groups: Vec<ResultGroup> = Vec::new();
    for result in ranked.iter().cloned() {
        let label = result.group_label.trim().to_string();
        match groups.iter_mut().find(|group| group.label == label) {
            Some(group) => group.results.push(result),
            None => groups.push(ResultGroup {
                label,
                results: vec![result],
            }),
        }
    }

    GroupedResults { groups, ranked }
}
