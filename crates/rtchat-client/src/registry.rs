use indexmap::IndexMap;

use crate::event::ToolEvent;

/// Latest event per tool, plus the tool currently selected for display.
///
/// Keys keep the position of their first insertion; overwriting a key does not
/// move it. The most recently upserted key is tracked separately and becomes
/// the selection whenever there is none.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    entries: IndexMap<String, ToolEvent>,
    last_upserted: Option<String>,
    selected: Option<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the mapping and clears the selection.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.last_upserted = None;
        self.selected = None;
    }

    /// Records `event` as the latest for `tool`.
    ///
    /// Returns `true` when the selection changed as a result.
    pub fn upsert(&mut self, tool: impl Into<String>, event: ToolEvent) -> bool {
        let tool = tool.into();
        self.entries.insert(tool.clone(), event);
        self.last_upserted = Some(tool);

        let selection_valid = self
            .selected
            .as_ref()
            .is_some_and(|s| self.entries.contains_key(s));
        if selection_valid {
            return false;
        }
        self.selected = self.last_upserted.clone();
        true
    }

    /// Explicit selection; accepted only for a current key.
    pub fn select(&mut self, tool: &str) -> bool {
        if !self.entries.contains_key(tool) {
            return false;
        }
        self.selected = Some(tool.to_string());
        true
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_event(&self) -> Option<&ToolEvent> {
        self.selected.as_ref().and_then(|s| self.entries.get(s))
    }

    pub fn last_upserted(&self) -> Option<&str> {
        self.last_upserted.as_deref()
    }

    pub fn get(&self, tool: &str) -> Option<&ToolEvent> {
        self.entries.get(tool)
    }

    /// Keys in insertion order, for a selection list.
    pub fn selectable_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(tool: &str, n: i64) -> ToolEvent {
        ToolEvent::from_value(json!({"tool": tool, "response": n}))
    }

    fn keys(r: &ToolRegistry) -> Vec<&str> {
        r.selectable_keys().collect()
    }

    #[test]
    fn first_upsert_selects_that_key() {
        let mut r = ToolRegistry::new();
        assert!(r.upsert("a", event("a", 1)));
        assert_eq!(r.selected(), Some("a"));
    }

    #[test]
    fn selection_is_sticky_across_updates() {
        let mut r = ToolRegistry::new();
        r.upsert("a", event("a", 1));
        r.upsert("b", event("b", 1));
        assert_eq!(r.selected(), Some("a"));
        assert!(r.select("b"));
        assert!(!r.upsert("a", event("a", 2)));
        assert_eq!(r.selected(), Some("b"));
        assert_eq!(r.get("a").map(|e| e.response.clone()), Some(json!(2)));
    }

    #[test]
    fn update_keeps_key_position_but_becomes_most_recent() {
        let mut r = ToolRegistry::new();
        r.upsert("a", event("a", 1));
        r.upsert("b", event("b", 1));
        r.upsert("a", event("a", 2));
        assert_eq!(keys(&r), vec!["a", "b"]);
        assert_eq!(r.last_upserted(), Some("a"));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn select_rejects_unknown_key() {
        let mut r = ToolRegistry::new();
        r.upsert("a", event("a", 1));
        assert!(!r.select("zzz"));
        assert_eq!(r.selected(), Some("a"));
    }

    #[test]
    fn reset_clears_selection_and_next_upsert_defaults_again() {
        let mut r = ToolRegistry::new();
        r.upsert("a", event("a", 1));
        r.upsert("b", event("b", 1));
        r.select("b");
        r.reset();
        assert!(r.is_empty());
        assert_eq!(r.selected(), None);
        assert!(r.selected_event().is_none());

        r.upsert("c", event("c", 1));
        assert_eq!(r.selected(), Some("c"));
        assert_eq!(r.selected_event().map(|e| e.tool.as_str()), Some("c"));
    }
}
