use std::collections::HashSet;

use crate::{find_by_item, Requirement, RequirementItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<RequirementItem>,
    pub updated: Vec<RequirementItem>,
    /// Items that appeared more than once in the imported batch. Only the
    /// first occurrence is merged.
    pub duplicates: Vec<RequirementItem>,
    /// Records dropped because their identifier was blank.
    pub skipped_blank: usize,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Merges an imported batch into `existing`, matching strictly by identifier.
///
/// Known items get their source fields (name, description, metadata) refreshed
/// while analysis results and generated test cases are kept. Only items whose
/// fields actually changed are reported as updated. Unknown items are
/// appended in import order.
pub fn merge_imported(existing: &mut Vec<Requirement>, imported: Vec<Requirement>) -> MergeReport {
    let mut report = MergeReport::default();
    let mut seen: HashSet<RequirementItem> = HashSet::new();

    for mut incoming in imported {
        incoming.item = incoming.item.trim().to_string();
        if incoming.item.is_empty() {
            report.skipped_blank += 1;
            continue;
        }
        if !seen.insert(incoming.item.clone()) {
            report.duplicates.push(incoming.item);
            continue;
        }

        match find_by_item(existing, &incoming.item) {
            Some(ix) => {
                let current = &mut existing[ix];
                let mut metadata = current.metadata.clone();
                metadata.extend(incoming.metadata);
                let changed = current.name != incoming.name
                    || current.description != incoming.description
                    || current.metadata != metadata;
                if changed {
                    current.name = incoming.name;
                    current.description = incoming.description;
                    current.metadata = metadata;
                    report.updated.push(current.item.clone());
                }
            }
            None => {
                report.added.push(incoming.item.clone());
                existing.push(incoming);
            }
        }
    }

    report
}
