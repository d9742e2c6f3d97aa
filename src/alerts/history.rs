use std::collections::VecDeque;

use super::config::AlertHistoryItem;

/// Maximum number of history entries kept
pub const MAX_HISTORY: usize = 20;

/// Newest-first alert history, truncated to a fixed capacity
#[derive(Debug, Clone)]
pub struct AlertHistory {
    items: VecDeque<AlertHistoryItem>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self {
            items: VecDeque::with_capacity(MAX_HISTORY),
        }
    }

    /// Prepend an item, evicting the oldest entries beyond capacity
    pub fn push(&mut self, item: AlertHistoryItem) {
        self.items.push_front(item);
        self.items.truncate(MAX_HISTORY);
    }

    pub fn latest(&self) -> Option<&AlertHistoryItem> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlertHistoryItem> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<AlertHistoryItem> {
        self.items.iter().cloned().collect()
    }
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::new()
    }
}
