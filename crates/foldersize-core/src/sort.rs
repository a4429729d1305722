/// Sort policies for sibling results.
///
/// All orderings are applied with a stable sort, so items that compare
/// equal keep the order in which they were produced.
use crate::model::SizeItem;
use serde::Serialize;
use std::cmp::Ordering;

/// How a set of sibling [`SizeItem`]s is ordered for presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Largest first; unknown sizes last.
    #[default]
    SizeDescending,
    /// Case-insensitive by name.
    NameAscending,
    /// Most recently modified first; unknown times last, ties by name.
    ModifiedDescending,
}

/// Case-insensitive name comparison. Names that differ only by case fall
/// back to a byte comparison so the order is total and deterministic.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Compare two items under `mode`.
pub fn compare(mode: SortMode, a: &SizeItem, b: &SizeItem) -> Ordering {
    match mode {
        SortMode::SizeDescending => match (a.bytes, b.bytes) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortMode::NameAscending => compare_names(&a.name, &b.name),
        SortMode::ModifiedDescending => match (a.modified, b.modified) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| compare_names(&a.name, &b.name)),
    }
}

/// Sort `items` in place under `mode` (stable).
pub fn sort_items(items: &mut [SizeItem], mode: SortMode) {
    items.sort_by(|a, b| compare(mode, a, b));
}
