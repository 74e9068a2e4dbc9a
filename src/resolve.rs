use crate::canvas::Document;
use crate::error::BookPressError;
use crate::toc::TocEntry;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// Anchor -> 1-based page number counted from the first page of the main body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PageMap {
    entries: BTreeMap<String, usize>,
}

impl PageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, anchor: &str) -> Option<usize> {
        self.entries.get(anchor).copied()
    }

    pub fn insert(&mut self, anchor: impl Into<String>, page: usize) {
        self.entries.insert(anchor.into(), page);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(anchor, page)| (anchor.as_str(), *page))
    }

    // Contents anchors with no entry, in contents order.
    pub fn missing<'a>(&self, entries: &'a [TocEntry]) -> Vec<&'a str> {
        entries
            .iter()
            .map(|entry| entry.anchor.as_str())
            .filter(|anchor| !self.entries.contains_key(*anchor))
            .collect()
    }
}

impl FromIterator<(String, usize)> for PageMap {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// The body starts on the first page exposing any contents anchor. Every
// contents anchor found from there on maps to its offset from that page plus
// one; the first occurrence of an anchor wins.
pub(crate) fn page_map_from_document(
    document: &Document,
    entries: &[TocEntry],
) -> Result<PageMap, BookPressError> {
    let targets: BTreeSet<&str> = entries.iter().map(|entry| entry.anchor.as_str()).collect();
    let start = document
        .pages
        .iter()
        .position(|page| page.anchors().any(|anchor| targets.contains(anchor)))
        .ok_or_else(|| {
            BookPressError::LayoutResolution(
                "no contents anchor found in the rendered document".to_string(),
            )
        })?;

    let mut map = PageMap::new();
    for (index, page) in document.pages.iter().enumerate().skip(start) {
        for anchor in page.anchors() {
            if targets.contains(anchor) && map.get(anchor).is_none() {
                map.insert(anchor, index - start + 1);
            }
        }
    }
    Ok(map)
}
