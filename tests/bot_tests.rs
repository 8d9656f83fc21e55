//! # Bot Tests
//!
//! End-to-end tests of the command dispatcher against the in-memory
//! backend: ordering, confirmations, deletion, admin listing and the
//! failure paths.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Local, TimeZone};
use orderbot::backend::{InMemoryBackend, KeyValueBackend, OrderWrite};
use orderbot::bot::OrderBot;
use orderbot::clock::{next_local_midnight, Clock, ManualClock};
use orderbot::config::BotConfig;
use orderbot::dialogue::OrderDialogueState;
use orderbot::export::{FileUpload, FileUploader};
use orderbot::order_store::{Order, OrderStore};
use orderbot::restaurants::{RestaurantDirectory, MISCELLANEOUS};
use orderbot::store_errors::StoreError;
use std::sync::{Arc, Mutex};

const RESTAURANTS: &str = r#"[
    ["Mizu", "mizu sushi", "mizu japanese"],
    ["Chipotle", "chipotle mexican grill"],
    ["Thai Market", "thai"]
]"#;

struct Harness {
    clock: Arc<ManualClock>,
    backend: Arc<InMemoryBackend>,
    store: OrderStore,
    bot: OrderBot,
}

fn setup_with_config(config: BotConfig) -> Result<Harness> {
    let start = Local
        .with_ymd_and_hms(2024, 3, 14, 11, 0, 0)
        .earliest()
        .expect("valid start time");
    let clock = Arc::new(ManualClock::new(start));
    let backend = Arc::new(InMemoryBackend::new(clock.clone()));
    let store = OrderStore::new(
        backend.clone(),
        clock.clone(),
        &config.prefix,
        std::time::Duration::from_secs(1),
    );
    let directory = RestaurantDirectory::from_json(RESTAURANTS)?;
    let bot = OrderBot::new(config, directory, vec!["Alice".to_string()], store.clone())?;

    Ok(Harness {
        clock,
        backend,
        store,
        bot,
    })
}

fn setup() -> Result<Harness> {
    setup_with_config(BotConfig::default())
}

#[tokio::test]
async fn test_known_aliases_store_canonical_order() -> Result<()> {
    let h = setup()?;

    for (user, alias) in [("jim", "Mizu"), ("pam", "mizu sushi"), ("dwight", "MIZU JAPANESE")] {
        let reply = h
            .bot
            .handle(user, &format!("orderbot: add: {alias}: Spicy Tuna Roll"))
            .await?;
        assert_eq!(
            reply,
            format!("{user}, your order to mizu was added successfully")
        );
        assert_eq!(
            h.store.current_order(user).await?,
            Some(Order::new(user, "mizu", "spicy tuna roll"))
        );

        let status = h.bot.handle(user, "orderbot: status").await?;
        assert!(status.contains("spicy tuna roll"));
        assert!(status.contains("mizu"));
    }

    Ok(())
}

#[tokio::test]
async fn test_duplicate_order_declined_keeps_original() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: mizu: spicy tuna roll").await?;

    let prompt = h.bot.handle("jim", "orderbot: add: thai: pad thai").await?;
    assert!(prompt.contains("already ordered today"));
    assert_eq!(
        h.bot.dialogue_state("jim"),
        OrderDialogueState::AwaitingDuplicateConfirm {
            restaurant: "thai market".to_string(),
            entree: "pad thai".to_string(),
        }
    );

    let reply = h.bot.handle("jim", "no").await?;
    assert!(reply.contains("keeping your earlier order"));
    assert_eq!(h.bot.dialogue_state("jim"), OrderDialogueState::Idle);
    assert_eq!(
        h.store.current_order("jim").await?,
        Some(Order::new("jim", "mizu", "spicy tuna roll"))
    );

    Ok(())
}

#[tokio::test]
async fn test_duplicate_order_accepted_replaces_original() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: mizu: spicy tuna roll").await?;
    h.bot.handle("jim", "orderbot: add: thai: pad thai").await?;

    let reply = h.bot.handle("jim", "Yes").await?;
    assert!(reply.contains("replaced your earlier one"));
    assert_eq!(
        h.store.current_order("jim").await?,
        Some(Order::new("jim", "thai market", "pad thai"))
    );
    // the old entry is gone from the other restaurant's hash
    assert!(h.store.orders_for("mizu").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_restaurant_confirmed_as_miscellaneous() -> Result<()> {
    let h = setup()?;

    let prompt = h.bot.handle("jim", "orderbot: add: Taco Shack: two tacos").await?;
    assert!(prompt.contains("taco shack is not one of our usual restaurants"));
    assert!(h.store.current_order("jim").await?.is_none());

    let reply = h.bot.handle("jim", "y").await?;
    assert!(reply.contains("Miscellaneous Restaurant"));
    assert_eq!(
        h.store.current_order("jim").await?,
        Some(Order::new("jim", MISCELLANEOUS, "taco shack: two tacos"))
    );

    let status = h.bot.handle("jim", "orderbot: status").await?;
    assert_eq!(status, "jim, today you ordered two tacos from taco shack");

    Ok(())
}

#[tokio::test]
async fn test_unknown_restaurant_declined_stores_nothing() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: taco shack: two tacos").await?;

    let reply = h.bot.handle("jim", "n").await?;
    assert!(reply.contains("was not saved"));
    assert_eq!(h.bot.dialogue_state("jim"), OrderDialogueState::Idle);
    assert!(h.store.current_order("jim").await?.is_none());
    assert!(h.store.all_orders().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_add_rejected_while_confirmation_pending() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: taco shack: two tacos").await?;
    let before = h.bot.dialogue_state("jim");

    let reply = h.bot.handle("jim", "orderbot: add: mizu: roll").await?;
    assert!(reply.contains("resolve your pending confirmation first"));
    assert_eq!(h.bot.dialogue_state("jim"), before);
    assert!(h.store.current_order("jim").await?.is_none());

    // malformed adds and other commands are held back too
    let reply = h.bot.handle("jim", "orderbot: add: mizu roll").await?;
    assert!(reply.contains("resolve your pending confirmation first"));
    let reply = h.bot.handle("jim", "orderbot: status").await?;
    assert!(reply.contains("resolve your pending confirmation first"));

    // other users are unaffected
    let reply = h.bot.handle("pam", "orderbot: add: mizu: roll").await?;
    assert!(reply.contains("added successfully"));

    Ok(())
}

#[tokio::test]
async fn test_stray_word_reprompts_same_question() -> Result<()> {
    let h = setup()?;
    let prompt = h.bot.handle("jim", "orderbot: add: taco shack: two tacos").await?;

    let reply = h.bot.handle("jim", "maybe").await?;
    assert_eq!(reply, prompt);
    assert!(h.bot.dialogue_state("jim").is_pending());

    Ok(())
}

#[tokio::test]
async fn test_stray_word_reprompts_duplicate_question() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: mizu: spicy tuna roll").await?;
    let prompt = h.bot.handle("jim", "orderbot: add: thai: pad thai").await?;

    let reply = h.bot.handle("jim", "perhaps").await?;
    assert_eq!(reply, prompt);
    assert!(matches!(
        h.bot.dialogue_state("jim"),
        OrderDialogueState::AwaitingDuplicateConfirm { .. }
    ));
    assert_eq!(
        h.store.current_order("jim").await?,
        Some(Order::new("jim", "mizu", "spicy tuna roll"))
    );

    Ok(())
}

#[tokio::test]
async fn test_list_while_pending() -> Result<()> {
    let h = setup()?;
    h.bot.handle("pam", "orderbot: add: mizu: roll").await?;

    // non-admins stay silent even with a question open
    h.bot.handle("jim", "orderbot: add: taco shack: tacos").await?;
    assert_eq!(h.bot.handle("jim", "orderbot: list: all").await?, "");
    assert!(h.bot.dialogue_state("jim").is_pending());

    // admins are told to answer first
    let admin_prompt = h.bot.handle("alice", "orderbot: add: noodle hut: ramen").await?;
    let reply = h.bot.handle("alice", "orderbot: list: all").await?;
    assert_eq!(
        reply,
        format!("alice, please resolve your pending confirmation first.\n{admin_prompt}")
    );
    assert!(!reply.contains("Orders for"));
    assert_eq!(
        h.bot.dialogue_state("alice"),
        OrderDialogueState::AwaitingUnknownRestaurantConfirm {
            raw_name: "noodle hut".to_string(),
            entree: "ramen".to_string(),
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_second_yes_is_silent() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: taco shack: two tacos").await?;

    assert!(!h.bot.handle("jim", "yes").await?.is_empty());
    assert_eq!(h.bot.handle("jim", "yes").await?, "");
    assert_eq!(h.store.all_orders().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_removes_order_and_pointer() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: chipotle: burrito bowl").await?;

    let reply = h.bot.handle("jim", "orderbot: delete").await?;
    assert_eq!(reply, "jim, your order from chipotle was deleted");
    assert!(!h.backend.exists(&h.store.user_key("jim")).await?);
    assert!(h.store.orders_for("chipotle").await?.is_empty());

    let status = h.bot.handle("jim", "orderbot: status").await?;
    assert_eq!(status, "jim, you have not ordered today");

    let reply = h.bot.handle("jim", "orderbot: delete").await?;
    assert_eq!(reply, "jim, you have nothing to delete");

    Ok(())
}

#[tokio::test]
async fn test_malformed_add_hints_without_mutation() -> Result<()> {
    let h = setup()?;

    let reply = h.bot.handle("jim", "orderbot: add: mizu spicy roll").await?;
    assert!(reply.contains("separate the restaurant name and your order with a colon"));
    assert_eq!(h.bot.dialogue_state("jim"), OrderDialogueState::Idle);
    assert!(h.store.all_orders().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_all_is_admin_only() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: mizu: spicy tuna roll").await?;
    h.bot.handle("pam", "orderbot: add: chipotle: burrito bowl").await?;
    h.bot.handle("dwight", "orderbot: add: beet farm: beets").await?;
    h.bot.handle("dwight", "yes").await?;

    assert_eq!(h.bot.handle("jim", "orderbot: list: all").await?, "");

    let reply = h.bot.handle("alice", "orderbot: list: all").await?;
    assert!(reply.starts_with("Orders for 2024-03-14"));
    let rows: Vec<&str> = reply
        .lines()
        .filter(|line| line.contains(" | ") && !line.starts_with("Name"))
        .collect();
    assert_eq!(rows.len(), 3);
    assert!(reply.contains("beet farm"));
    assert!(reply.contains("burrito bowl"));

    Ok(())
}

#[tokio::test]
async fn test_list_single_restaurant_resolves_alias() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: mizu: spicy tuna roll").await?;
    h.bot.handle("pam", "orderbot: add: chipotle: burrito bowl").await?;

    let reply = h.bot.handle("Alice", "orderbot: list: mizu sushi").await?;
    assert!(reply.contains("spicy tuna roll"));
    assert!(!reply.contains("burrito bowl"));

    let reply = h.bot.handle("alice", "orderbot: list: thai").await?;
    assert_eq!(reply, "Nobody has ordered from thai market");

    let reply = h.bot.handle("alice", "orderbot: list: noodle hut").await?;
    assert_eq!(reply, "Nobody has ordered from noodle hut");

    Ok(())
}

#[tokio::test]
async fn test_list_with_no_orders() -> Result<()> {
    let h = setup()?;
    assert_eq!(
        h.bot.handle("alice", "orderbot: list").await?,
        "Nobody has ordered today"
    );
    Ok(())
}

#[tokio::test]
async fn test_help_shows_admin_section_to_admins_only() -> Result<()> {
    let h = setup()?;

    let help = h.bot.handle("jim", "orderbot: help").await?;
    assert!(help.contains("orderbot: add: restaurant: order"));
    assert!(!help.contains("list: all"));

    let help = h.bot.handle("alice", "orderbot: ?").await?;
    assert!(help.contains("list: all"));

    Ok(())
}

#[tokio::test]
async fn test_channel_chatter_is_ignored() -> Result<()> {
    let h = setup()?;

    assert_eq!(h.bot.handle("jim", "who is getting lunch today?").await?, "");
    assert_eq!(h.bot.handle("jim", "orderbot: dance").await?, "");
    assert_eq!(h.bot.handle("jim", "no").await?, "");
    assert_eq!(h.bot.handle("jim", "hungry").await?, "");
    assert!(h.store.all_orders().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_orders_expire_at_midnight() -> Result<()> {
    let h = setup()?;
    h.bot.handle("jim", "orderbot: add: mizu: spicy tuna roll").await?;

    let midnight = next_local_midnight(h.clock.now());
    h.clock.set(midnight - Duration::seconds(1));
    assert!(h.store.current_order("jim").await?.is_some());

    h.clock.set(midnight);
    assert!(h.store.current_order("jim").await?.is_none());

    // a new day means no duplicate prompt
    let reply = h.bot.handle("jim", "orderbot: add: mizu: salmon roll").await?;
    assert!(reply.contains("added successfully"));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_adds_from_same_user_write_once() -> Result<()> {
    let h = setup()?;

    let (first, second) = tokio::join!(
        h.bot.handle("jim", "orderbot: add: mizu: spicy tuna roll"),
        h.bot.handle("jim", "orderbot: add: chipotle: burrito bowl"),
    );
    let replies = [first?, second?];

    let added = replies
        .iter()
        .filter(|r| r.contains("added successfully"))
        .count();
    let prompted = replies
        .iter()
        .filter(|r| r.contains("already ordered today"))
        .count();
    assert_eq!((added, prompted), (1, 1));
    assert_eq!(h.store.all_orders().await?.len(), 1);

    Ok(())
}

struct UnreachableBackend;

#[async_trait]
impl KeyValueBackend for UnreachableBackend {
    async fn hash_set(&self, _: &str, _: &str, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn hash_get(&self, _: &str, _: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn hash_get_all(&self, _: &str) -> Result<Vec<(String, String)>, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn hash_delete(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn set(&self, _: &str, _: &str) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn exists(&self, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn delete(&self, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn write_order(&self, _: &OrderWrite) -> Result<(), StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn keys_matching(&self, _: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
    async fn set_members(&self, _: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Connection("connection refused".into()))
    }
}

#[tokio::test]
async fn test_store_unavailable_fails_request_and_keeps_pending() -> Result<()> {
    let clock = Arc::new(ManualClock::new(Local::now()));
    let store = OrderStore::new(
        Arc::new(UnreachableBackend),
        clock,
        "orderbot",
        std::time::Duration::from_secs(1),
    );
    let bot = OrderBot::new(
        BotConfig::default(),
        RestaurantDirectory::from_json(RESTAURANTS)?,
        Vec::new(),
        store,
    )?;

    let err = bot
        .handle("jim", "orderbot: add: mizu: roll")
        .await
        .unwrap_err();
    assert!(err.is_unavailable());

    // the unknown-restaurant prompt needs no store, but confirming it does
    bot.handle("jim", "orderbot: add: taco shack: tacos").await?;
    assert!(bot.handle("jim", "yes").await.is_err());
    assert!(bot.dialogue_state("jim").is_pending());

    Ok(())
}

#[derive(Default)]
struct RecordingUploader {
    uploads: Mutex<Vec<FileUpload>>,
}

#[async_trait]
impl FileUploader for RecordingUploader {
    async fn upload(&self, file: &FileUpload) -> Result<()> {
        self.uploads.lock().unwrap().push(file.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_large_list_is_uploaded_as_file() -> Result<()> {
    let mut config = BotConfig::default();
    config.export.threshold = 2;
    let h = setup_with_config(config)?;
    let uploader = Arc::new(RecordingUploader::default());
    let bot = h.bot.with_uploader(uploader.clone());

    for user in ["jim", "pam", "dwight"] {
        bot.handle(user, "orderbot: add: mizu: roll").await?;
    }

    let reply = bot.handle("alice", "orderbot: list: all").await?;
    assert_eq!(reply, "Exported 3 orders as orders-2024-03-14.txt");

    let uploads = uploader.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].title, "Orders for 2024-03-14");
    assert_eq!(uploads[0].channel, "#seamless-thursday");
    assert_eq!(uploads[0].content.lines().count(), 5);

    Ok(())
}
