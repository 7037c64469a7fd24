//! Scope-keyed multi-select.
//!
//! Each scope ("wanted", "library-series", ...) owns an independent
//! sub-store. Every operation looks up exactly one sub-store, so nothing
//! addressed to one scope can observe or change another. The selected set
//! is only reachable through the operations below.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Selection state of a single scope.
#[derive(Debug, Clone)]
struct ScopeSelection<I> {
    selected: HashSet<I>,
    /// Visible index of the last toggled item.
    anchor: Option<usize>,
}

impl<I> Default for ScopeSelection<I> {
    fn default() -> Self {
        Self {
            selected: HashSet::new(),
            anchor: None,
        }
    }
}

/// Multi-select store keyed by scope name.
#[derive(Debug, Clone)]
pub struct SelectionStore<I> {
    scopes: HashMap<String, ScopeSelection<I>>,
}

impl<I> Default for SelectionStore<I> {
    fn default() -> Self {
        Self {
            scopes: HashMap::new(),
        }
    }
}

impl<I> SelectionStore<I>
where
    I: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn scope_mut(&mut self, scope: &str) -> &mut ScopeSelection<I> {
        self.scopes.entry(scope.to_string()).or_default()
    }

    /// Toggle `id`, which sits at `visible_index` in `visible_ids`.
    ///
    /// Without the range modifier (or without an anchor) this flips `id`.
    /// With it, every visible id between the anchor and `visible_index`
    /// (inclusive, either direction) is added; ids outside the range are
    /// left alone. The part of the range that falls outside the current
    /// visible list is ignored. The anchor always moves to `visible_index`.
    pub fn toggle(
        &mut self,
        scope: &str,
        id: I,
        visible_index: usize,
        range_modifier: bool,
        visible_ids: &[I],
    ) {
        let state = self.scope_mut(scope);

        match state.anchor.filter(|_| range_modifier) {
            Some(anchor) => {
                let lo = anchor.min(visible_index);
                let hi = anchor.max(visible_index);
                if let Some(last) = visible_ids.len().checked_sub(1) {
                    if lo <= last {
                        let hi = hi.min(last);
                        state.selected.extend(visible_ids[lo..=hi].iter().cloned());
                    }
                }
                tracing::trace!(scope, lo, hi, "range selection");
            }
            None => {
                if !state.selected.remove(&id) {
                    state.selected.insert(id);
                }
            }
        }

        state.anchor = Some(visible_index);
    }

    /// Replace the scope's selection with exactly `ids`.
    pub fn select_all(&mut self, scope: &str, ids: impl IntoIterator<Item = I>) {
        let state = self.scope_mut(scope);
        state.selected = ids.into_iter().collect();
    }

    /// Empty the scope's selection and forget its anchor.
    pub fn clear(&mut self, scope: &str) {
        if let Some(state) = self.scopes.get_mut(scope) {
            state.selected.clear();
            state.anchor = None;
        }
    }

    pub fn is_selected(&self, scope: &str, id: &I) -> bool {
        self.scopes
            .get(scope)
            .is_some_and(|s| s.selected.contains(id))
    }

    /// Number of selected ids, stale ones included.
    pub fn selected_count(&self, scope: &str) -> usize {
        self.scopes.get(scope).map_or(0, |s| s.selected.len())
    }

    /// Selected ids that are still visible, in visible order.
    ///
    /// Ids selected under an earlier filter stay in the store but are
    /// excluded here, so counts and batch payloads only cover what the
    /// user can see.
    pub fn selected_visible(&self, scope: &str, visible_ids: &[I]) -> Vec<I> {
        let Some(state) = self.scopes.get(scope) else {
            return Vec::new();
        };
        visible_ids
            .iter()
            .filter(|id| state.selected.contains(*id))
            .cloned()
            .collect()
    }

    pub fn anchor(&self, scope: &str) -> Option<usize> {
        self.scopes.get(scope).and_then(|s| s.anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISIBLE: [&str; 5] = ["a", "b", "c", "d", "e"];

    fn selected(store: &SelectionStore<&'static str>, scope: &str) -> Vec<&'static str> {
        store.selected_visible(scope, &VISIBLE)
    }

    #[test]
    fn plain_toggle_flips_and_sets_anchor() {
        let mut store = SelectionStore::new();
        store.toggle("wanted", "c", 2, false, &VISIBLE);
        assert!(store.is_selected("wanted", &"c"));
        assert_eq!(store.anchor("wanted"), Some(2));

        store.toggle("wanted", "c", 2, false, &VISIBLE);
        assert!(!store.is_selected("wanted", &"c"));
    }

    #[test]
    fn range_toggle_selects_between_anchor_and_index() {
        let mut store = SelectionStore::new();
        store.toggle("wanted", "b", 1, false, &VISIBLE);
        store.toggle("wanted", "d", 3, true, &VISIBLE);
        assert_eq!(selected(&store, "wanted"), vec!["b", "c", "d"]);
        assert_eq!(store.selected_count("wanted"), 3);
    }

    #[test]
    fn range_toggle_works_backwards_and_keeps_outside_ids() {
        let mut store = SelectionStore::new();
        store.toggle("wanted", "a", 0, false, &VISIBLE);
        store.toggle("wanted", "e", 4, false, &VISIBLE);
        store.toggle("wanted", "c", 2, true, &VISIBLE);
        assert_eq!(selected(&store, "wanted"), vec!["a", "c", "d", "e"]);
    }

    #[test]
    fn range_without_anchor_is_plain_toggle() {
        let mut store = SelectionStore::new();
        store.toggle("wanted", "d", 3, true, &VISIBLE);
        assert_eq!(selected(&store, "wanted"), vec!["d"]);
        assert_eq!(store.anchor("wanted"), Some(3));
    }

    #[test]
    fn stale_anchor_clamps_to_visible_range() {
        let mut store = SelectionStore::new();
        let long: Vec<&str> = vec!["a", "b", "c", "d", "e", "f", "g", "h"];
        store.toggle("wanted", "h", 7, false, &long);

        // Filter shrinks the list to three items.
        let short = ["a", "b", "c"];
        store.toggle("wanted", "b", 1, true, &short);
        assert_eq!(store.selected_visible("wanted", &short), vec!["b", "c"]);
        assert!(store.is_selected("wanted", &"h"));
    }

    #[test]
    fn range_entirely_out_of_bounds_selects_nothing() {
        let mut store = SelectionStore::new();
        let long: Vec<&str> = vec!["a", "b", "c", "d", "e", "f", "g", "h"];
        store.toggle("wanted", "g", 6, false, &long);
        store.toggle("wanted", "h", 7, true, &["a", "b"]);
        assert_eq!(store.selected_visible("wanted", &["a", "b"]), Vec::<&str>::new());
        assert_eq!(store.anchor("wanted"), Some(7));
    }

    #[test]
    fn empty_visible_list_range_is_noop() {
        let mut store: SelectionStore<&str> = SelectionStore::new();
        store.toggle("wanted", "a", 0, false, &VISIBLE);
        store.toggle("wanted", "b", 1, true, &[]);
        assert_eq!(store.selected_count("wanted"), 1);
    }

    #[test]
    fn select_all_replaces_and_clear_resets() {
        let mut store = SelectionStore::new();
        store.toggle("wanted", "a", 0, false, &VISIBLE);
        store.select_all("wanted", ["c", "d"]);
        assert_eq!(selected(&store, "wanted"), vec!["c", "d"]);

        store.clear("wanted");
        assert_eq!(store.selected_count("wanted"), 0);
        assert_eq!(store.anchor("wanted"), None);

        // With the anchor gone, a range click is a plain toggle again.
        store.toggle("wanted", "e", 4, true, &VISIBLE);
        assert_eq!(selected(&store, "wanted"), vec!["e"]);
    }

    #[test]
    fn scopes_are_isolated() {
        let mut store = SelectionStore::new();
        store.select_all("library-series", [1, 2, 3]);
        store.toggle("library-series", 4, 3, false, &[1, 2, 3, 4]);
        let before = store.selected_visible("library-series", &[1, 2, 3, 4, 5]);
        let anchor_before = store.anchor("library-series");

        store.toggle("wanted", 5, 0, false, &[5]);
        store.toggle("wanted", 2, 1, true, &[5, 2]);
        store.select_all("wanted", [9]);
        store.clear("wanted");

        assert_eq!(store.selected_visible("library-series", &[1, 2, 3, 4, 5]), before);
        assert_eq!(store.anchor("library-series"), anchor_before);
        assert!(!store.is_selected("library-series", &5));
    }

    #[test]
    fn stale_ids_excluded_from_visible_selection() {
        let mut store = SelectionStore::new();
        store.select_all("wanted", ["a", "b", "z"]);
        assert_eq!(store.selected_count("wanted"), 3);
        assert_eq!(selected(&store, "wanted"), vec!["a", "b"]);
    }

    #[test]
    fn unknown_scope_reads_are_empty() {
        let store: SelectionStore<u32> = SelectionStore::new();
        assert!(!store.is_selected("nope", &1));
        assert_eq!(store.selected_count("nope"), 0);
        assert!(store.selected_visible("nope", &[1, 2]).is_empty());
    }
}
