// Plain substring removal, not word-boundary aware. "Leeds United" becomes
// "leeds", but names containing these fragments elsewhere get over-stripped.
// Only ever used for comparison, never for display.
const AFFIXES: &[&str] = &[
    " fc", "fc ", "cf ", " cf", " as", "as ", "united", "city", "town",
];

/// Canonical comparison key for a scraped team name.
///
/// Passes repeat until nothing changes, so normalizing a normalized name is a
/// no-op.
pub fn normalize_team_name(raw: &str) -> String {
    let mut current = raw.trim().to_lowercase();
    loop {
        let next = strip_affixes_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_affixes_once(name: &str) -> String {
    let mut out = name.to_string();
    for affix in AFFIXES {
        out = out.replace(affix, "");
    }
    out.trim().to_string()
}

/// Substring containment in either direction.
///
/// A name that normalizes to nothing (e.g. "City") is contained in every
/// key, so it overlaps any fixture in the window.
pub fn names_overlap(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}
