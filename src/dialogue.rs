//! Confirmation dialogue module for tracking yes/no prompts per user.

use std::collections::HashMap;
use std::sync::Mutex;

/// Represents the conversation state of one user
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OrderDialogueState {
    #[default]
    Idle,
    /// The restaurant matched no directory entry; store as miscellaneous?
    AwaitingUnknownRestaurantConfirm { raw_name: String, entree: String },
    /// The user already ordered today; replace the existing order?
    AwaitingDuplicateConfirm { restaurant: String, entree: String },
}

impl OrderDialogueState {
    pub fn is_pending(&self) -> bool {
        !matches!(self, OrderDialogueState::Idle)
    }
}

/// Process-local store of pending confirmations.
///
/// A user holds at most one pending confirmation; setting a new one
/// replaces the old. Nothing here expires: an abandoned prompt stays until
/// the user answers it or the process restarts.
#[derive(Debug, Default)]
pub struct PendingTracker {
    states: Mutex<HashMap<String, OrderDialogueState>>,
}

impl PendingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for the user, `Idle` when nothing is pending
    pub fn get(&self, user: &str) -> OrderDialogueState {
        self.lock().get(user).cloned().unwrap_or_default()
    }

    pub fn set_unknown(&self, user: &str, raw_name: &str, entree: &str) {
        self.lock().insert(
            user.to_string(),
            OrderDialogueState::AwaitingUnknownRestaurantConfirm {
                raw_name: raw_name.to_string(),
                entree: entree.to_string(),
            },
        );
    }

    pub fn set_duplicate(&self, user: &str, restaurant: &str, entree: &str) {
        self.lock().insert(
            user.to_string(),
            OrderDialogueState::AwaitingDuplicateConfirm {
                restaurant: restaurant.to_string(),
                entree: entree.to_string(),
            },
        );
    }

    /// Drop the user's pending confirmation, returning it
    pub fn clear(&self, user: &str) -> OrderDialogueState {
        self.lock().remove(user).unwrap_or_default()
    }

    /// Number of users with an open prompt
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, OrderDialogueState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }
}
