//! Keyword-group matching over document pages
//!
//! A group is hit when any of its keywords appears as a substring of any
//! page. Results accumulate monotonically: once a group is true it stays
//! true, and page iteration stops as soon as every group is satisfied.

use std::collections::BTreeMap;

use crate::keywords::{NEGATIVE_PREFIX, POSITIVE_PREFIX};

/// Scan pages against pre-compiled keyword groups (case folding already
/// applied to keywords by [`crate::keywords::KeywordConfig::compiled_groups`]).
///
/// `pages` is consumed lazily; with an empty or immediately-satisfied group
/// set, later pages are never pulled. A group with no keywords is never hit.
pub fn match_groups<I, S>(
    pages: I,
    groups: &BTreeMap<String, Vec<String>>,
    case_sensitive: bool,
) -> BTreeMap<String, bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result: BTreeMap<String, bool> =
        groups.keys().map(|name| (name.clone(), false)).collect();

    // Check before pulling the next page: a group set satisfied on page k
    // must never read page k+1, and an empty set reads nothing.
    let mut pages = pages.into_iter();
    while !result.values().all(|&hit| hit) {
        let Some(page) = pages.next() else { break };

        let page = page.as_ref();
        let text = if case_sensitive {
            page.to_string()
        } else {
            page.to_lowercase()
        };

        for (name, keywords) in groups {
            if result[name] {
                continue;
            }
            if keywords.iter().any(|kw| text.contains(kw.as_str())) {
                result.insert(name.clone(), true);
            }
        }
    }

    result
}

/// Fold per-group hits into one document-level confirmation: at least one
/// `_pos*` group hit and no `_neg*` group hit. Groups outside those
/// prefixes are informational only.
pub fn document_relevance(hits: &BTreeMap<String, bool>) -> bool {
    let mut relevant = false;
    for (name, &hit) in hits {
        if name.starts_with(POSITIVE_PREFIX) {
            relevant |= hit;
        }
    }
    for (name, &hit) in hits {
        if name.starts_with(NEGATIVE_PREFIX) {
            relevant &= !hit;
        }
    }
    relevant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(name, kws)| {
                (name.to_string(), kws.iter().map(|s| s.to_string()).collect())
            })
            .collect()
    }

    /// Page iterator that counts how many pages were actually pulled.
    struct CountingPages<'a> {
        pages: std::slice::Iter<'a, &'a str>,
        read: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl<'a> Iterator for CountingPages<'a> {
        type Item = &'a str;
        fn next(&mut self) -> Option<&'a str> {
            let page = self.pages.next().copied()?;
            self.read.set(self.read.get() + 1);
            Some(page)
        }
    }

    fn counting<'a>(
        pages: &'a [&'a str],
    ) -> (CountingPages<'a>, std::rc::Rc<std::cell::Cell<usize>>) {
        let read = std::rc::Rc::new(std::cell::Cell::new(0));
        (CountingPages { pages: pages.iter(), read: read.clone() }, read)
    }

    #[test]
    fn test_group_hit_on_any_keyword() {
        let g = groups(&[("bench", &["kinetics", "ucf101"])]);
        let hits = match_groups(["we evaluate on ucf101 splits"], &g, false);
        assert!(hits["bench"]);
    }

    #[test]
    fn test_group_stays_true_on_later_pages() {
        let g = groups(&[("bench", &["kinetics"]), ("code", &["never-present"])]);
        let pages = ["kinetics-400 results", "unrelated page", "more unrelated text"];
        let hits = match_groups(pages, &g, false);
        assert!(hits["bench"]);
        assert!(!hits["code"]);
    }

    #[test]
    fn test_early_termination_after_all_groups_hit() {
        let g = groups(&[("a", &["alpha"]), ("b", &["beta"])]);
        let pages = ["alpha and beta on page one", "page two", "page three"];
        let (iter, read) = counting(&pages);
        let hits = match_groups(iter, &g, false);
        assert!(hits["a"] && hits["b"]);
        assert_eq!(read.get(), 1);
    }

    #[test]
    fn test_empty_group_set_reads_no_pages() {
        let g = groups(&[]);
        let pages = ["page one", "page two"];
        let (iter, read) = counting(&pages);
        let hits = match_groups(iter, &g, false);
        assert!(hits.is_empty());
        assert_eq!(read.get(), 0);
    }

    #[test]
    fn test_empty_keyword_list_never_hits() {
        let g = groups(&[("empty", &[]), ("real", &["beta"])]);
        let pages = ["alpha", "beta", "gamma"];
        let hits = match_groups(pages, &g, false);
        assert!(!hits["empty"]);
        assert!(hits["real"]);
    }

    #[test]
    fn test_case_insensitive_page_folding() {
        let g = groups(&[("code", &["mmaction2"])]);
        let hits = match_groups(["Built on MMAction2."], &g, false);
        assert!(hits["code"]);
    }

    #[test]
    fn test_case_sensitive_respects_case() {
        let g = groups(&[("code", &["MMAction2"])]);
        assert!(!match_groups(["built on mmaction2"], &g, true)["code"]);
        assert!(match_groups(["built on MMAction2"], &g, true)["code"]);
    }

    #[test]
    fn test_document_relevance_requires_pos_and_no_neg() {
        let mut hits = BTreeMap::new();
        hits.insert("_pos0".to_string(), true);
        hits.insert("_neg0".to_string(), false);
        hits.insert("mmaction2".to_string(), true);
        assert!(document_relevance(&hits));

        hits.insert("_neg0".to_string(), true);
        assert!(!document_relevance(&hits));

        hits.insert("_neg0".to_string(), false);
        hits.insert("_pos0".to_string(), false);
        assert!(!document_relevance(&hits));
    }

    #[test]
    fn test_document_relevance_without_pos_groups_is_false() {
        let mut hits = BTreeMap::new();
        hits.insert("mmaction2".to_string(), true);
        assert!(!document_relevance(&hits));
    }
}
