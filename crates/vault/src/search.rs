//! Ranked fuzzy search over vault entries.
//!
//! A needle matches a haystack when its characters occur in order, not necessarily
//! adjacent, ignoring case. The rank is the haystack length minus the unmatched runs at
//! either edge, so lower is better: a match that starts at the first character and ends at
//! the last one ranks the full length, while `"hom"` against `"homer_simpson"` ranks `3`.
//! A rank of `0` means no match.

use crate::model::{Entry, Field};

/// A run of consecutive haystack characters, all matched or all unmatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub text: String,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// Lower is better; `0` when the needle was not found.
    pub rank: usize,
    /// The original haystack split into highlighted runs, in order.
    pub slices: Vec<Slice>,
}

impl FuzzyMatch {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        self.rank > 0
    }

    fn miss(haystack: &str) -> Self {
        Self { rank: 0, slices: vec![Slice { text: haystack.to_owned(), matched: false }] }
    }
}

/// Matches `needle` against `haystack`, case-insensitively.
///
/// Every start offset is tried; from each, needle characters are consumed greedily left to
/// right. The candidate with the lowest rank wins, the earliest one on ties. An empty needle
/// never matches.
///
/// # Example
/// ```rust
/// use passio_vault::search::fuzzy_match;
///
/// let found = fuzzy_match("username+newrelic@gmail.com", "nrelic");
/// assert_eq!(found.rank, 8);
/// let marked: Vec<_> = found.slices.iter().filter(|s| s.matched).map(|s| s.text.as_str()).collect();
/// assert_eq!(marked, ["n", "relic"]);
/// ```
#[must_use]
pub fn fuzzy_match(haystack: &str, needle: &str) -> FuzzyMatch {
    let original: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = needle.chars().collect();

    if needle.is_empty() || needle.len() > original.len() {
        return FuzzyMatch::miss(haystack);
    }

    let mut best: Option<FuzzyMatch> = None;
    let mut matched = vec![false; original.len()];

    for offset in 0..=original.len() - needle.len() {
        matched.fill(false);
        let mut next = 0;
        for (index, &c) in original.iter().enumerate().skip(offset) {
            if next == needle.len() {
                break;
            }
            if same_char(c, needle[next]) {
                matched[index] = true;
                next += 1;
            }
        }

        // Later offsets scan a suffix of this one and cannot match either.
        if next < needle.len() {
            break;
        }

        let rank = edge_rank(&matched);
        if best.as_ref().is_none_or(|found| rank < found.rank) {
            best = Some(FuzzyMatch { rank, slices: slices(&original, &matched) });
        }
    }

    best.unwrap_or_else(|| FuzzyMatch::miss(haystack))
}

fn same_char(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Length minus the unmatched runs touching either end.
fn edge_rank(matched: &[bool]) -> usize {
    let leading = matched.iter().take_while(|&&m| !m).count();
    let trailing = matched.iter().rev().take_while(|&&m| !m).count();
    matched.len() - leading - trailing
}

fn slices(original: &[char], matched: &[bool]) -> Vec<Slice> {
    let mut out: Vec<Slice> = Vec::new();
    for (&c, &is_match) in original.iter().zip(matched) {
        match out.last_mut() {
            Some(slice) if slice.matched == is_match => slice.text.push(c),
            _ => out.push(Slice { text: c.to_string(), matched: is_match }),
        }
    }
    out
}

/// One entry found by [`SearchIndex::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub entry: Entry,
    /// Best rank over the searchable fields.
    pub rank: usize,
    /// The field that produced `rank`.
    pub field: Field,
    /// Highlighting for `field`.
    pub slices: Vec<Slice>,
}

/// Ranks a set of entries against free-text queries.
///
/// Only [`Field::SEARCHABLE`] fields are scored; the password never contributes to a
/// result.
#[derive(Debug, Clone, Copy)]
pub struct SearchIndex<'a> {
    entries: &'a [Entry],
}

impl<'a> SearchIndex<'a> {
    #[must_use]
    pub const fn new(entries: &'a [Entry]) -> Self {
        Self { entries }
    }

    /// Scores every entry lazily, in display order, skipping entries that do not match.
    pub fn hits(self, query: &'a str) -> impl Iterator<Item = SearchHit> + 'a {
        self.entries
            .iter()
            .filter(move |_| !query.is_empty())
            .filter_map(move |entry| score(entry, query))
    }

    /// Matching entries, best rank first. Equal ranks keep display order.
    ///
    /// An empty query returns nothing rather than everything.
    #[must_use]
    pub fn search(self, query: &str) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self.hits(query).collect();
        hits.sort_by_key(|hit| hit.rank);
        hits
    }
}

fn score(entry: &Entry, query: &str) -> Option<SearchHit> {
    let mut best: Option<(Field, FuzzyMatch)> = None;
    for field in Field::SEARCHABLE {
        let found = fuzzy_match(entry.field(field), query);
        if found.is_match() && best.as_ref().is_none_or(|(_, b)| found.rank < b.rank) {
            best = Some((field, found));
        }
    }
    best.map(|(field, found)| SearchHit {
        entry: entry.clone(),
        rank: found.rank,
        field,
        slices: found.slices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(found: &FuzzyMatch) -> Vec<(&str, bool)> {
        found.slices.iter().map(|s| (s.text.as_str(), s.matched)).collect()
    }

    #[test]
    fn ranks_the_documented_example() {
        let found =
            fuzzy_match("The path of the righteous man is beset on all sides...", "rigisbset");
        assert_eq!(found.rank, 22);
        assert_eq!(
            marked(&found),
            [
                ("The path of the ", false),
                ("rig", true),
                ("hteous man ", false),
                ("is", true),
                (" ", false),
                ("b", true),
                ("e", false),
                ("set", true),
                (" on all sides...", false),
            ]
        );
    }

    #[test]
    fn prefers_the_tightest_offset() {
        let found =
            fuzzy_match("The path of the righteous man is beset on all sides...", "thepathrightman");
        assert_eq!(found.rank, 29);

        let relic = fuzzy_match("username+newrelic@gmail.com", "nrelic");
        assert_eq!(relic.rank, 8);
        assert_eq!(
            marked(&relic),
            [("username+", false), ("n", true), ("ew", false), ("relic", true), ("@gmail.com", false)]
        );
    }

    #[test]
    fn ignores_case_but_keeps_original_text() {
        let found = fuzzy_match("GitHub", "github");
        assert_eq!(found.rank, 6);
        assert_eq!(marked(&found), [("GitHub", true)]);
    }

    #[test]
    fn short_and_exact_needles() {
        assert_eq!(fuzzy_match("password", "pass").rank, 4);
        assert_eq!(fuzzy_match("abc", "abc").rank, 3);
        assert_eq!(fuzzy_match("xaxbx", "ab").rank, 3);
    }

    #[test]
    fn misses_return_the_whole_haystack() {
        for (haystack, needle) in [("sublime_text", "is_pretty_cool"), ("abc", "abd"), ("abc", "")] {
            let found = fuzzy_match(haystack, needle);
            assert_eq!(found.rank, 0);
            assert!(!found.is_match());
            assert_eq!(marked(&found), [(haystack, false)]);
        }
    }

    #[test]
    fn handles_multibyte_characters() {
        let found = fuzzy_match("Ünïcode façade", "FAÇ");
        assert_eq!(found.rank, 3);
        assert_eq!(found.slices[1].text, "faç");
    }
}
