//! Command handlers and confirmation resolution

use tracing::{info, warn};

use crate::command::ListTarget;
use crate::dialogue::OrderDialogueState;
use crate::export::{render_order_table, FileUpload};
use crate::localization::{t, t_args};
use crate::order_store::Order;
use crate::restaurants::MISCELLANEOUS;
use crate::store_errors::StoreError;

use super::dispatcher::OrderBot;

/// Handle `add: <restaurant>: <entree>` for a user with nothing pending
pub async fn handle_add(
    bot: &OrderBot,
    user: &str,
    restaurant: &str,
    entree: &str,
) -> Result<String, StoreError> {
    let Some(canonical) = bot.directory.resolve(restaurant) else {
        info!(
            user = %user,
            restaurant = %restaurant,
            "Unknown restaurant, asking for confirmation"
        );
        bot.pending.set_unknown(user, restaurant, entree);
        return Ok(pending_prompt(user, &bot.pending.get(user)));
    };

    if let Some(existing) = bot.store.current_order(user).await? {
        info!(
            user = %user,
            existing = %existing.restaurant,
            restaurant = %canonical,
            "Second order today, asking for confirmation"
        );
        bot.pending.set_duplicate(user, canonical, entree);
        return Ok(pending_prompt(user, &bot.pending.get(user)));
    }

    bot.store.place_order(user, canonical, entree).await?;
    Ok(t_args("order-added", &[("user", user), ("restaurant", canonical)]))
}

/// Resolve the user's pending confirmation with a yes or a no
pub async fn handle_confirmation(
    bot: &OrderBot,
    user: &str,
    state: OrderDialogueState,
    accepted: bool,
) -> Result<String, StoreError> {
    let reply = match (&state, accepted) {
        (OrderDialogueState::AwaitingUnknownRestaurantConfirm { raw_name, entree }, true) => {
            let combined = format!("{raw_name}: {entree}");
            bot.store.place_order(user, MISCELLANEOUS, &combined).await?;
            t_args("miscellaneous-added", &[("user", user), ("raw", raw_name)])
        }
        (OrderDialogueState::AwaitingUnknownRestaurantConfirm { raw_name, .. }, false) => {
            t_args("unknown-restaurant-declined", &[("user", user), ("raw", raw_name)])
        }
        (OrderDialogueState::AwaitingDuplicateConfirm { restaurant, entree }, true) => {
            bot.store.place_order(user, restaurant, entree).await?;
            t_args("order-replaced", &[("user", user), ("restaurant", restaurant)])
        }
        (OrderDialogueState::AwaitingDuplicateConfirm { .. }, false) => {
            t_args("duplicate-order-declined", &[("user", user)])
        }
        (OrderDialogueState::Idle, _) => return Ok(String::new()),
    };

    // only after the store accepted the write
    bot.pending.clear(user);
    info!(user = %user, accepted, "Confirmation resolved");
    Ok(reply)
}

/// Handle `status`
pub async fn handle_status(bot: &OrderBot, user: &str) -> Result<String, StoreError> {
    match bot.store.current_order(user).await? {
        Some(order) => {
            let (restaurant, entree) = order.display_parts();
            Ok(t_args(
                "status-ordered",
                &[("user", user), ("entree", &entree), ("restaurant", &restaurant)],
            ))
        }
        None => Ok(t_args("status-none", &[("user", user)])),
    }
}

/// Handle `delete`
pub async fn handle_delete(bot: &OrderBot, user: &str) -> Result<String, StoreError> {
    match bot.store.remove_order(user).await? {
        Some(order) => {
            let (restaurant, _) = order.display_parts();
            Ok(t_args("delete-done", &[("user", user), ("restaurant", &restaurant)]))
        }
        None => Ok(t_args("delete-none", &[("user", user)])),
    }
}

/// Handle `list` for an admin
pub async fn handle_list(bot: &OrderBot, target: &ListTarget) -> Result<String, StoreError> {
    let date = bot.store.today().format("%Y-%m-%d").to_string();
    let title = t_args("list-title", &[("date", &date)]);

    let orders = match target {
        ListTarget::All => {
            let orders = bot.store.all_orders().await?;
            if orders.is_empty() {
                return Ok(t("list-empty"));
            }
            if let Some(reply) = export_if_large(bot, &orders, &title, &date).await {
                return Ok(reply);
            }
            orders
        }
        ListTarget::Restaurant(name) => {
            let canonical = if name == MISCELLANEOUS {
                Some(MISCELLANEOUS)
            } else {
                bot.directory.resolve(name)
            };
            let orders = match canonical {
                Some(canonical) => bot.store.orders_for(canonical).await?,
                None => Vec::new(),
            };
            if orders.is_empty() {
                let shown = canonical.unwrap_or(name.as_str());
                return Ok(t_args("list-empty-restaurant", &[("restaurant", shown)]));
            }
            orders
        }
    };

    Ok(format!("{title}\n```\n{}```", render_order_table(&orders)))
}

/// Upload the table when it is over the threshold; `None` means reply inline
async fn export_if_large(
    bot: &OrderBot,
    orders: &[Order],
    title: &str,
    date: &str,
) -> Option<String> {
    let uploader = bot.uploader.as_ref()?;
    if orders.len() <= bot.config.export.threshold {
        return None;
    }

    let file = FileUpload {
        channel: bot.config.channel.clone(),
        title: title.to_string(),
        filename: format!("orders-{date}.txt"),
        content: render_order_table(orders),
    };

    match uploader.upload(&file).await {
        Ok(()) => {
            let count = orders.len().to_string();
            Some(t_args(
                "list-exported",
                &[("count", &count), ("filename", &file.filename)],
            ))
        }
        Err(e) => {
            warn!(error = %e, "Order export upload failed, replying inline");
            None
        }
    }
}

/// Handle `help`; admins also see the `list` usage
pub fn handle_help(bot: &OrderBot, user: &str) -> String {
    let prefix = bot.parser.prefix();
    let mut text = t_args("help", &[("prefix", prefix)]);
    if bot.is_admin(user) {
        text.push('\n');
        text.push_str(&t_args("help-admin", &[("prefix", prefix)]));
    }
    text
}

pub fn malformed_add_reply(bot: &OrderBot, user: &str) -> String {
    t_args("malformed-add", &[("user", user), ("prefix", bot.parser.prefix())])
}

/// The yes/no question for a pending confirmation
pub fn pending_prompt(user: &str, state: &OrderDialogueState) -> String {
    match state {
        OrderDialogueState::AwaitingUnknownRestaurantConfirm { raw_name, .. } => {
            t_args("unknown-restaurant-prompt", &[("user", user), ("raw", raw_name)])
        }
        OrderDialogueState::AwaitingDuplicateConfirm { restaurant, entree } => t_args(
            "duplicate-order-prompt",
            &[("user", user), ("entree", entree), ("restaurant", restaurant)],
        ),
        OrderDialogueState::Idle => String::new(),
    }
}

/// Reply to any command other than yes/no while a confirmation is open
pub fn reject_while_pending(user: &str, state: &OrderDialogueState) -> String {
    format!(
        "{}\n{}",
        t_args("pending-first", &[("user", user)]),
        pending_prompt(user, state)
    )
}
