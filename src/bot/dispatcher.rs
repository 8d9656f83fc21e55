//! Dispatcher: routes a parsed command, together with the user's pending
//! confirmation, to the handler that answers it.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::command::{Command, CommandParser};
use crate::config::BotConfig;
use crate::dialogue::{OrderDialogueState, PendingTracker};
use crate::export::FileUploader;
use crate::order_store::OrderStore;
use crate::restaurants::RestaurantDirectory;
use crate::store_errors::StoreError;

use super::handlers::{
    handle_add, handle_confirmation, handle_delete, handle_help, handle_list, handle_status,
    malformed_add_reply, pending_prompt, reject_while_pending,
};
use super::user_locks::UserLocks;

/// The order bot: parser, directory, admin set, store and per-user state
pub struct OrderBot {
    pub(super) config: BotConfig,
    pub(super) parser: CommandParser,
    pub(super) directory: RestaurantDirectory,
    pub(super) admins: HashSet<String>,
    pub(super) store: OrderStore,
    pub(super) pending: PendingTracker,
    pub(super) uploader: Option<Arc<dyn FileUploader>>,
    locks: UserLocks,
}

impl OrderBot {
    /// Build a bot; `admins` are merged case-insensitively
    pub fn new<I>(
        config: BotConfig,
        directory: RestaurantDirectory,
        admins: I,
        store: OrderStore,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let parser = CommandParser::new(&config.prefix)
            .with_context(|| format!("Invalid bot prefix: {}", config.prefix))?;
        let admins = admins
            .into_iter()
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty())
            .collect();

        Ok(Self {
            config,
            parser,
            directory,
            admins,
            store,
            pending: PendingTracker::new(),
            uploader: None,
            locks: UserLocks::new(),
        })
    }

    /// Upload large `list: all` tables through this uploader
    pub fn with_uploader(mut self, uploader: Arc<dyn FileUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn is_admin(&self, user: &str) -> bool {
        self.admins.contains(&user.trim().to_lowercase())
    }

    /// The user's confirmation state
    pub fn dialogue_state(&self, user: &str) -> OrderDialogueState {
        self.pending.get(user)
    }

    /// Handle one message; an empty reply means stay silent.
    ///
    /// Store failures abort the request and leave any pending
    /// confirmation in place.
    pub async fn handle(&self, user: &str, text: &str) -> Result<String, StoreError> {
        let command = self.parser.parse(text);
        if command == Command::NoMatch {
            return Ok(String::new());
        }

        let _guard = self.locks.acquire(user).await;
        let state = self.pending.get(user);
        debug!(user = %user, state = ?state, command = ?command, "Dispatching command");

        if state.is_pending() {
            self.dispatch_pending(user, state, command).await
        } else {
            self.dispatch_idle(user, command).await
        }
    }

    async fn dispatch_pending(
        &self,
        user: &str,
        state: OrderDialogueState,
        command: Command,
    ) -> Result<String, StoreError> {
        match command {
            Command::Confirm(accepted) => handle_confirmation(self, user, state, accepted).await,
            Command::Reply(_) => Ok(pending_prompt(user, &state)),
            Command::List(_) if !self.is_admin(user) => {
                warn!(user = %user, "List requested by non-admin");
                Ok(String::new())
            }
            Command::Add { .. }
            | Command::MalformedAdd
            | Command::Delete
            | Command::Status
            | Command::List(_)
            | Command::Help => {
                warn!(user = %user, "Command rejected while a confirmation is pending");
                Ok(reject_while_pending(user, &state))
            }
            Command::NoMatch => Ok(String::new()),
        }
    }

    async fn dispatch_idle(&self, user: &str, command: Command) -> Result<String, StoreError> {
        match command {
            Command::Add { restaurant, entree } => {
                handle_add(self, user, &restaurant, &entree).await
            }
            Command::MalformedAdd => Ok(malformed_add_reply(self, user)),
            Command::Delete => handle_delete(self, user).await,
            Command::Status => handle_status(self, user).await,
            Command::List(target) => {
                if self.is_admin(user) {
                    handle_list(self, &target).await
                } else {
                    warn!(user = %user, "List requested by non-admin");
                    Ok(String::new())
                }
            }
            Command::Help => Ok(handle_help(self, user)),
            // nothing to confirm
            Command::Confirm(_) | Command::Reply(_) | Command::NoMatch => Ok(String::new()),
        }
    }
}
