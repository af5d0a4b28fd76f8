//! Recipient set construction.

use leadflow_core::types::Recipient;
use std::collections::{BTreeSet, HashSet};

/// Recipients whose id is in `selection` and whose category matches `category`
/// case-insensitively, in `collection` order.
///
/// A blank filter means "no filter". Recipients without a category never
/// match a non-blank filter.
pub fn build_recipient_set(
    collection: &[Recipient],
    selection: &HashSet<i64>,
    category: Option<&str>,
) -> Vec<Recipient> {
    let filter = category
        .filter(|c| !c.trim().is_empty())
        .map(str::to_lowercase);

    collection
        .iter()
        .filter(|r| selection.contains(&r.id))
        .filter(|r| match &filter {
            None => true,
            Some(wanted) => r
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == *wanted),
        })
        .cloned()
        .collect()
}

/// Distinct trimmed, non-empty categories, sorted.
pub fn unique_categories(collection: &[Recipient]) -> Vec<String> {
    collection
        .iter()
        .filter_map(|r| r.category.as_deref())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(id: i64, category: Option<&str>) -> Recipient {
        Recipient {
            id,
            display_name: format!("Lead {id}"),
            contact_handle: format!("1199999{id:04}"),
            category: category.map(String::from),
        }
    }

    fn ids(set: &[Recipient]) -> Vec<i64> {
        set.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_category_filter_is_case_insensitive() {
        let collection = vec![r(1, Some("Clínica")), r(2, Some("clínica")), r(3, Some("Loja"))];
        let selection: HashSet<i64> = [1, 2, 3].into();
        let set = build_recipient_set(&collection, &selection, Some("Clínica"));
        assert_eq!(ids(&set), vec![1, 2]);
    }

    #[test]
    fn test_selection_limits_membership_and_keeps_order() {
        let collection = vec![r(5, None), r(3, Some("Loja")), r(9, None), r(1, None)];
        let selection: HashSet<i64> = [1, 5, 9].into();
        let set = build_recipient_set(&collection, &selection, None);
        assert_eq!(ids(&set), vec![5, 9, 1]);
    }

    #[test]
    fn test_missing_category_never_matches_filter() {
        let collection = vec![r(1, None), r(2, Some("Loja"))];
        let selection: HashSet<i64> = [1, 2].into();
        let set = build_recipient_set(&collection, &selection, Some("loja"));
        assert_eq!(ids(&set), vec![2]);
    }

    #[test]
    fn test_blank_filter_is_no_filter() {
        let collection = vec![r(1, None), r(2, Some("Loja"))];
        let selection: HashSet<i64> = [1, 2].into();
        let set = build_recipient_set(&collection, &selection, Some("  "));
        assert_eq!(ids(&set), vec![1, 2]);
    }

    #[test]
    fn test_nothing_matches_is_empty() {
        let collection = vec![r(1, Some("Loja"))];
        let set = build_recipient_set(&collection, &HashSet::new(), None);
        assert!(set.is_empty());
        let selection: HashSet<i64> = [1].into();
        let set = build_recipient_set(&collection, &selection, Some("Academia"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_unique_categories() {
        let collection = vec![
            r(1, Some("Loja ")),
            r(2, Some("Academia")),
            r(3, Some("Loja")),
            r(4, Some("")),
            r(5, None),
        ];
        assert_eq!(unique_categories(&collection), vec!["Academia", "Loja"]);
    }
}
