use crate::buildings::BuildingRecord;

/// Case-insensitive subsequence test: every character of `query` appears in
/// `label` in the same relative order. An empty query matches everything.
pub fn is_subsequence(query: &str, label: &str) -> bool {
    let mut wanted = query.chars().flat_map(char::to_lowercase).peekable();
    if wanted.peek().is_none() {
        return true;
    }

    for c in label.chars().flat_map(char::to_lowercase) {
        if wanted.peek() == Some(&c) {
            wanted.next();
            if wanted.peek().is_none() {
                return true;
            }
        }
    }
    false
}

/// Buildings whose label matches `query`, in their original order.
pub fn filter<'a>(query: &str, buildings: &'a [BuildingRecord]) -> Vec<&'a BuildingRecord> {
    buildings
        .iter()
        .filter(|building| is_subsequence(query, &building.label))
        .collect()
}
