//! Header flattening for multi-row spreadsheet headers.

use std::collections::HashSet;

/// Join the non-empty parts of each column's header rows with a space.
///
/// Parts that are blank or the literal `nan` are skipped, so a top cell of
/// `"District"` over `"Name"` gives `"District Name"` and an empty top cell
/// over `"ID"` gives `"ID"`.
pub fn flatten_headers(header_rows: &[Vec<Option<String>>], width: usize) -> Vec<String> {
    let names = (0..width)
        .map(|idx| {
            header_rows
                .iter()
                .filter_map(|row| row.get(idx).and_then(|cell| cell.as_deref()))
                .map(str::trim)
                .filter(|part| !part.is_empty() && *part != "nan")
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    dedupe_names(names)
}

/// Name blank columns and suffix repeated names so every column is unique.
pub fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());

    for (idx, name) in names.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name.trim().to_string()
        };

        let mut candidate = base.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }

    out
}
