//! Search filtering of visible leads
//!
//! A filter narrows what the user sees and can hover. It never takes part in
//! index computation: reordering always runs against the full stage list, so
//! hidden leads keep their relative order around a move among visible ones.

use crate::types::Lead;

/// Case-insensitive search term matched against lead names and tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadFilter {
    term: String,
}

impl LeadFilter {
    /// Create a filter. Surrounding whitespace is ignored and a leading `#`
    /// restricts the match to tags.
    pub fn new(term: impl AsRef<str>) -> Self {
        Self {
            term: term.as_ref().trim().to_lowercase(),
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// An empty filter matches everything
    pub fn is_empty(&self) -> bool {
        self.term.is_empty() || self.term == "#"
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        if self.is_empty() {
            return true;
        }
        if let Some(tag) = self.term.strip_prefix('#') {
            return lead.tags.iter().any(|t| t.to_lowercase() == tag);
        }
        lead.name.to_lowercase().contains(&self.term)
            || lead.tags.iter().any(|t| t.to_lowercase().contains(&self.term))
    }
}

/// Whether a lead is visible under an optional filter
pub fn is_visible(lead: &Lead, filter: Option<&LeadFilter>) -> bool {
    filter.is_none_or(|f| f.matches(lead))
}

/// The visible subsequence of a full stage list, in display order
pub fn visible<'a>(leads: &'a [Lead], filter: Option<&LeadFilter>) -> Vec<&'a Lead> {
    leads.iter().filter(|l| is_visible(l, filter)).collect()
}

/// Map a position in the visible subsequence to a position in the full list.
///
/// Returns the full index of the `visible_index`th visible lead, or
/// `full.len()` when `visible_index` is past the last visible lead.
pub fn visible_to_full_index(full: &[Lead], filter: Option<&LeadFilter>, visible_index: usize) -> usize {
    full.iter()
        .enumerate()
        .filter(|(_, l)| is_visible(l, filter))
        .nth(visible_index)
        .map(|(index, _)| index)
        .unwrap_or(full.len())
}
