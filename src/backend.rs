//! # Key-Value Backend Module
//!
//! The low-level key-value interface the order store is built on, plus an
//! in-process implementation. The in-memory backend honours absolute
//! expiry against an injected [`Clock`], which makes daily expiry testable.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::store_errors::StoreError;

/// One order write, applied all or nothing: drop the user's entry from
/// the previous restaurant hash, store the new entry and the user pointer,
/// and expire both keys at `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWrite {
    /// Hash holding the entry being replaced
    pub previous_hash: Option<String>,
    pub hash_key: String,
    pub field: String,
    pub value: String,
    pub pointer_key: String,
    pub pointer_value: String,
    /// Unix seconds
    pub expires_at: i64,
}

/// Trait defining the key-value operations the order store consumes.
///
/// Mirrors the subset of redis commands the bot needs: hashes for
/// per-restaurant orders, plain strings for user pointers and sets for
/// the admin list. Writes that touch several keys go through
/// [`KeyValueBackend::write_order`] so they land together or not at all.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError>;
    /// Returns whether the field existed
    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
    /// Atomic multi-key order write
    async fn write_order(&self, write: &OrderWrite) -> Result<(), StoreError>;
    /// Glob match in the style of redis `KEYS` (`*` and `?` wildcards)
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<i64>,
}

/// In-memory backend for development and testing
pub struct InMemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Seed a set, e.g. the admin list
    pub fn add_set_member(&self, key: &str, member: &str) {
        let mut entries = self.lock();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(BTreeSet::new()),
            expires_at: None,
        });
        if let Value::Set(members) = &mut entry.value {
            members.insert(member.to_string());
        }
    }

    /// Lock the map and drop whatever has expired by now
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        let now = self.clock.now().timestamp();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
        entries
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Backend(format!(
        "WRONGTYPE operation against key {key} holding the wrong kind of value"
    ))
}

#[async_trait]
impl KeyValueBackend for InMemoryBackend {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(BTreeMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(fields) => {
                fields.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(wrong_type(key)),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        match self.lock().get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        match self.lock().get(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::Hash(fields)) => Ok(fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        let (removed, now_empty) = match entries.get_mut(key).map(|e| &mut e.value) {
            None => return Ok(false),
            Some(Value::Hash(fields)) => (fields.remove(field).is_some(), fields.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };
        // redis drops a hash once its last field is gone
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // SET replaces any previous value and clears its TTL
        self.lock().insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.lock().get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock().contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock().remove(key).is_some())
    }

    async fn write_order(&self, write: &OrderWrite) -> Result<(), StoreError> {
        let mut entries = self.lock();

        // type-check every hash first so a failure leaves nothing half written
        for key in write.previous_hash.iter().chain([&write.hash_key]) {
            if let Some(entry) = entries.get(key) {
                if !matches!(entry.value, Value::Hash(_)) {
                    return Err(wrong_type(key));
                }
            }
        }

        if let Some(previous) = &write.previous_hash {
            let now_empty = match entries.get_mut(previous).map(|e| &mut e.value) {
                Some(Value::Hash(fields)) => {
                    fields.remove(&write.field);
                    fields.is_empty()
                }
                _ => false,
            };
            if now_empty {
                entries.remove(previous);
            }
        }

        let entry = entries
            .entry(write.hash_key.clone())
            .or_insert_with(|| Entry {
                value: Value::Hash(BTreeMap::new()),
                expires_at: None,
            });
        if let Value::Hash(fields) = &mut entry.value {
            fields.insert(write.field.clone(), write.value.clone());
        }
        entry.expires_at = Some(write.expires_at);

        entries.insert(
            write.pointer_key.clone(),
            Entry {
                value: Value::Text(write.pointer_value.clone()),
                expires_at: Some(write.expires_at),
            },
        );
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .lock()
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.lock().get(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }
}

/// Match `text` against a redis-style glob (`*` any run, `?` one char)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
