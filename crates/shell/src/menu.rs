//! Navigation menu contributed to by hosted modules.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One menu entry. Unknown fields sent by a module are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub path: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MenuItem {
    pub fn new(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            icon: None,
            extra: Map::new(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Ordered menu, unique by `path`.
#[derive(Debug, Default)]
pub struct MenuRegistry {
    items: Mutex<Vec<MenuItem>>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MenuItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `item` unless an entry with the same path exists.
    /// Returns whether it was added.
    pub fn add_item(&self, item: MenuItem) -> bool {
        let mut items = self.lock();
        if items.iter().any(|existing| existing.path == item.path) {
            return false;
        }
        items.push(item);
        true
    }

    /// Add each item in order; returns how many were new.
    pub fn add_items<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = MenuItem>,
    {
        items
            .into_iter()
            .filter(|item| self.add_item(item.clone()))
            .count()
    }

    /// Add items from an untyped payload sent by a module.
    ///
    /// Anything but an array is ignored, as are entries without a string `path`.
    pub fn add_items_json(&self, payload: &Value) -> usize {
        let Some(entries) = payload.as_array() else {
            tracing::debug!("ignoring non-array menu payload");
            return 0;
        };
        let items = entries.iter().filter_map(|entry| {
            serde_json::from_value::<MenuItem>(entry.clone())
                .inspect_err(|err| tracing::debug!("skipping menu entry: {err}"))
                .ok()
        });
        self.add_items(items)
    }

    /// Remove the entry at `path`; returns whether one existed.
    pub fn remove_item(&self, path: &str) -> bool {
        let mut items = self.lock();
        let before = items.len();
        items.retain(|item| item.path != path);
        items.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn items(&self) -> Vec<MenuItem> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn paths(menu: &MenuRegistry) -> Vec<String> {
        menu.items().into_iter().map(|i| i.path).collect()
    }

    #[test]
    fn duplicate_paths_are_ignored() {
        let menu = MenuRegistry::new();
        assert!(menu.add_item(MenuItem::new("/admin/users", "Users")));
        assert!(!menu.add_item(MenuItem::new("/admin/users", "Users again")));

        assert_eq!(menu.len(), 1);
        assert_eq!(menu.items()[0].label, "Users");
    }

    #[test]
    fn bulk_add_remove_and_clear() {
        let menu = MenuRegistry::new();
        let added = menu.add_items([
            MenuItem::new("/a", "A"),
            MenuItem::new("/b", "B").with_icon("box"),
            MenuItem::new("/a", "A2"),
        ]);
        assert_eq!(added, 2);
        assert_eq!(paths(&menu), vec!["/a", "/b"]);

        assert!(menu.remove_item("/a"));
        assert!(!menu.remove_item("/a"));
        assert_eq!(paths(&menu), vec!["/b"]);

        menu.clear();
        assert!(menu.is_empty());
    }

    #[test]
    fn json_payloads_keep_unknown_fields() {
        let menu = MenuRegistry::new();
        let added = menu.add_items_json(&json!([
            { "path": "/admin", "label": "Admin", "order": 3 },
            { "label": "no path" },
            "garbage",
        ]));
        assert_eq!(added, 1);
        assert_eq!(menu.items()[0].extra.get("order"), Some(&json!(3)));

        assert_eq!(menu.add_items_json(&json!({ "path": "/x" })), 0);
        assert_eq!(menu.len(), 1);
    }

    proptest! {
        /// Whatever is added, paths stay unique and keep first-seen order.
        #[test]
        fn paths_unique_in_first_seen_order(raw in prop::collection::vec(0u8..8, 0..40)) {
            let menu = MenuRegistry::new();
            menu.add_items(raw.iter().map(|n| MenuItem::new(format!("/p{n}"), n.to_string())));

            let mut expected: Vec<String> = Vec::new();
            for n in &raw {
                let path = format!("/p{n}");
                if !expected.contains(&path) {
                    expected.push(path);
                }
            }
            prop_assert_eq!(paths(&menu), expected);
        }
    }
}
