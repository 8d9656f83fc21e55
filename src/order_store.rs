//! # Order Store Module
//!
//! Adapter between the bot and the key-value backend. Layout:
//!
//! - `orders:<restaurant>`: hash of `{user -> entree}`
//! - `<bot>:users:<user>`: name of the restaurant holding the user's order
//! - `<bot>:admins`: set of admin ids, never expires
//!
//! Every write re-arms expiry at the next local midnight, so each day's
//! orders clear on their own. Every backend call is bounded by the
//! configured timeout.

use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::backend::{KeyValueBackend, OrderWrite};
use crate::clock::{next_local_midnight, Clock};
use crate::restaurants::MISCELLANEOUS;
use crate::store_errors::StoreError;

const ORDERS_PREFIX: &str = "orders:";

/// A user's order for the day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub user: String,
    /// Canonical restaurant name, or `miscellaneous`
    pub restaurant: String,
    /// Entree text; for `miscellaneous` orders this is `raw_name: entree`
    pub entree: String,
}

impl Order {
    pub fn new(user: &str, restaurant: &str, entree: &str) -> Self {
        Self {
            user: user.to_string(),
            restaurant: restaurant.to_string(),
            entree: entree.to_string(),
        }
    }

    /// Restaurant and entree as a person would read them.
    ///
    /// Miscellaneous orders carry the free-text restaurant name inside the
    /// entree, so it is split back out here.
    pub fn display_parts(&self) -> (String, String) {
        if self.restaurant == MISCELLANEOUS {
            if let Some((raw, entree)) = self.entree.split_once(':') {
                return (raw.trim().to_string(), entree.trim().to_string());
            }
        }
        (self.restaurant.clone(), self.entree.clone())
    }
}

/// Daily order storage on top of a [`KeyValueBackend`]
#[derive(Clone)]
pub struct OrderStore {
    backend: Arc<dyn KeyValueBackend>,
    clock: Arc<dyn Clock>,
    namespace: String,
    timeout: Duration,
}

impl OrderStore {
    pub fn new(
        backend: Arc<dyn KeyValueBackend>,
        clock: Arc<dyn Clock>,
        namespace: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            clock,
            namespace: namespace.to_string(),
            timeout,
        }
    }

    pub fn order_key(restaurant: &str) -> String {
        format!("{ORDERS_PREFIX}{restaurant}")
    }

    pub fn user_key(&self, user: &str) -> String {
        format!("{}:users:{}", self.namespace, user)
    }

    pub fn admins_key(&self) -> String {
        format!("{}:admins", self.namespace)
    }

    /// Local calendar date the current orders belong to
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Unix timestamp of the next local midnight
    fn expiry(&self) -> i64 {
        next_local_midnight(self.clock.now()).timestamp()
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation = %operation, error = %e, "Store operation failed");
                Err(e)
            }
            Err(_) => {
                error!(
                    operation = %operation,
                    timeout = ?self.timeout,
                    "Store operation timed out"
                );
                Err(StoreError::Timeout(format!(
                    "{operation} exceeded {:?}",
                    self.timeout
                )))
            }
        }
    }

    /// The user's order for today, if any
    pub async fn current_order(&self, user: &str) -> Result<Option<Order>, StoreError> {
        let key = self.user_key(user);
        let Some(restaurant) = self.bounded("get", self.backend.get(&key)).await? else {
            return Ok(None);
        };

        let hash_key = Self::order_key(&restaurant);
        let entree = self
            .bounded("hget", self.backend.hash_get(&hash_key, user))
            .await?;

        match entree {
            Some(entree) => Ok(Some(Order {
                user: user.to_string(),
                restaurant,
                entree,
            })),
            None => {
                debug!(user = %user, restaurant = %restaurant, "Pointer without order entry");
                Ok(None)
            }
        }
    }

    /// Store the user's order, replacing any order they already had today.
    ///
    /// The replacement, the pointer and both expiries are one backend
    /// write; on error the previous order is still in place.
    pub async fn place_order(
        &self,
        user: &str,
        restaurant: &str,
        entree: &str,
    ) -> Result<Order, StoreError> {
        let user_key = self.user_key(user);
        let previous = self.bounded("get", self.backend.get(&user_key)).await?;
        if let Some(previous) = &previous {
            debug!(user = %user, restaurant = %previous, "Replacing previous order entry");
        }

        let expires = self.expiry();
        let write = OrderWrite {
            previous_hash: previous.as_deref().map(Self::order_key),
            hash_key: Self::order_key(restaurant),
            field: user.to_string(),
            value: entree.to_string(),
            pointer_key: user_key,
            pointer_value: restaurant.to_string(),
            expires_at: expires,
        };
        self.bounded("write_order", self.backend.write_order(&write))
            .await?;

        info!(user = %user, restaurant = %restaurant, expires_at = expires, "Order stored");
        Ok(Order::new(user, restaurant, entree))
    }

    /// Remove the user's order and pointer, returning what was removed
    pub async fn remove_order(&self, user: &str) -> Result<Option<Order>, StoreError> {
        let existing = self.current_order(user).await?;
        let user_key = self.user_key(user);

        if let Some(order) = &existing {
            let hash_key = Self::order_key(&order.restaurant);
            self.bounded("hdel", self.backend.hash_delete(&hash_key, user))
                .await?;
            info!(user = %user, restaurant = %order.restaurant, "Order removed");
        }
        // a dangling pointer goes as well
        self.bounded("del", self.backend.delete(&user_key)).await?;

        Ok(existing)
    }

    /// Every order placed with one restaurant today
    pub async fn orders_for(&self, restaurant: &str) -> Result<Vec<Order>, StoreError> {
        let hash_key = Self::order_key(restaurant);
        let entries = self
            .bounded("hgetall", self.backend.hash_get_all(&hash_key))
            .await?;

        Ok(entries
            .into_iter()
            .map(|(user, entree)| Order {
                user,
                restaurant: restaurant.to_string(),
                entree,
            })
            .collect())
    }

    /// Every order placed today, across all restaurants
    pub async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        let pattern = format!("{ORDERS_PREFIX}*");
        let keys = self
            .bounded("keys", self.backend.keys_matching(&pattern))
            .await?;

        let mut orders = Vec::new();
        for key in keys {
            if let Some(restaurant) = key.strip_prefix(ORDERS_PREFIX) {
                orders.extend(self.orders_for(restaurant).await?);
            }
        }
        debug!(orders = orders.len(), "Collected all orders");
        Ok(orders)
    }

    /// Admin ids kept in the backend
    pub async fn load_admins(&self) -> Result<Vec<String>, StoreError> {
        let key = self.admins_key();
        self.bounded("smembers", self.backend.set_members(&key))
            .await
    }
}
