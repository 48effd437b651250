//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Authorship: only the author mutates a tweet
//! - Terminal deletion: deleted tweets reject every further mutation
//! - Id stability: ids equal creation order and never collide
//! - Deterministic replay: Same events → same state
//! - Ownership: only the owner withdraws, always successfully

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tweet_ledger::{
    Command, Config, Error, Ledger, Principal, TweetId, TweetLedger, UnauthorizedReason,
};

/// Strategy for generating principals from a small pool (so collisions happen)
fn principal_strategy() -> impl Strategy<Value = Principal> {
    prop_oneof![
        Just(Principal::new("owner")),
        Just(Principal::new("alice")),
        Just(Principal::new("bob")),
    ]
}

/// Strategy for generating deposit amounts (positive decimals)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000_00u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Strategy for generating arbitrary commands against a small id range
fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        ".{0,40}".prop_map(|content| Command::CreateTweet { content }),
        (0u64..8, ".{0,40}").prop_map(|(id, content)| Command::EditTweet {
            id: TweetId::new(id),
            content,
        }),
        (0u64..8).prop_map(|id| Command::DeleteTweet { id: TweetId::new(id) }),
        amount_strategy().prop_map(|amount| Command::Deposit { amount }),
        Just(Command::Withdraw),
    ]
}

fn owner() -> Principal {
    Principal::new("owner")
}

/// Create test ledger with temp directory
async fn create_test_ledger(temp_dir: &tempfile::TempDir) -> Ledger {
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();
    config.owner = Some("owner".to_string());

    Ledger::open(config).await.unwrap()
}

#[test]
fn fresh_ledger_is_empty() {
    let ledger = TweetLedger::new(owner());
    assert!(ledger.get_tweets().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: a created tweet is enumerated with exactly its content
    #[test]
    fn prop_create_then_enumerate(content in ".*", author in principal_strategy()) {
        let mut ledger = TweetLedger::new(owner());
        let id = ledger.create_tweet(&author, content.clone()).unwrap();

        let tweets = ledger.get_tweets();
        prop_assert_eq!(tweets.len(), 1);
        prop_assert_eq!(tweets[0].id, id);
        prop_assert_eq!(&tweets[0].content, &content);
        prop_assert_eq!(&tweets[0].author, &author);
    }

    /// Property: non-authors can neither edit nor delete
    #[test]
    fn prop_non_author_rejected(original in ".*", replacement in ".*") {
        let mut ledger = TweetLedger::new(owner());
        let alice = Principal::new("alice");
        let bob = Principal::new("bob");
        let id = ledger.create_tweet(&alice, original.clone()).unwrap();

        let err = ledger.edit_tweet(&bob, id, replacement).unwrap_err();
        prop_assert!(matches!(err, Error::Unauthorized(UnauthorizedReason::NotAuthor)));

        let err = ledger.delete_tweet(&bob, id).unwrap_err();
        prop_assert!(matches!(err, Error::Unauthorized(UnauthorizedReason::NotAuthor)));

        let tweets = ledger.get_tweets();
        prop_assert_eq!(tweets.len(), 1);
        prop_assert_eq!(&tweets[0].content, &original);
    }

    /// Property: deletion is terminal and removes exactly one tweet from enumeration
    #[test]
    fn prop_delete_is_terminal(count in 1usize..20, pick in any::<prop::sample::Index>()) {
        let mut ledger = TweetLedger::new(owner());
        let alice = Principal::new("alice");
        for i in 0..count {
            ledger.create_tweet(&alice, format!("tweet {}", i)).unwrap();
        }

        let id = TweetId::new(pick.index(count) as u64);
        let before = ledger.get_tweets().len();
        ledger.delete_tweet(&alice, id).unwrap();

        let after = ledger.get_tweets();
        prop_assert_eq!(after.len(), before - 1);
        prop_assert!(after.iter().all(|tweet| tweet.id != id));

        prop_assert!(matches!(ledger.edit_tweet(&alice, id, "again"), Err(Error::AlreadyDeleted(_))));
        prop_assert!(matches!(ledger.delete_tweet(&alice, id), Err(Error::AlreadyDeleted(_))));
    }

    /// Property: only the owner withdraws, and the owner always can
    #[test]
    fn prop_withdraw_owner_only(
        deposits in prop::collection::vec(amount_strategy(), 0..10),
        caller in principal_strategy(),
    ) {
        let mut ledger = TweetLedger::new(owner());
        let total: Decimal = deposits.iter().copied().sum();
        for amount in deposits {
            ledger.deposit(&Principal::new("patron"), amount).unwrap();
        }

        let result = ledger.withdraw(&caller);
        if caller == owner() {
            let withdrawal = result.unwrap();
            prop_assert_eq!(withdrawal.amount, total);
            prop_assert_eq!(ledger.balance(), Decimal::ZERO);
        } else {
            prop_assert!(matches!(result, Err(Error::Unauthorized(UnauthorizedReason::NotOwner))));
            prop_assert_eq!(ledger.balance(), total);
        }
    }

    /// Property: under any command sequence, ids follow creation order and
    /// enumeration is ascending, gap-free of deleted records only
    #[test]
    fn prop_random_sequences_keep_invariants(
        steps in prop::collection::vec((principal_strategy(), command_strategy()), 1..60),
    ) {
        let mut ledger = TweetLedger::new(owner());
        let mut events = Vec::new();
        let mut created = 0u64;

        for (caller, command) in steps {
            let is_create = matches!(command, Command::CreateTweet { .. });
            let head = ledger.head_hash();
            match ledger.execute(&caller, command, Utc::now()) {
                Ok(event) => {
                    if is_create {
                        prop_assert_eq!(event.kind.tweet_id(), Some(TweetId::new(created)));
                        created += 1;
                    }
                    events.push(event);
                }
                Err(e) => {
                    prop_assert!(e.is_rejection());
                    prop_assert_eq!(ledger.head_hash(), head);
                }
            }
        }

        prop_assert_eq!(ledger.tweet_count(), created);

        let tweets = ledger.get_tweets();
        prop_assert!(tweets.windows(2).all(|pair| pair[0].id < pair[1].id));
        prop_assert!(tweets.iter().all(|tweet| !tweet.is_deleted));

        // Deterministic replay
        tweet_ledger::crypto::verify_chain(&events).unwrap();
        let replayed = TweetLedger::replay(owner(), events).unwrap();
        prop_assert_eq!(replayed.records(), ledger.records());
        prop_assert_eq!(replayed.balance(), ledger.balance());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    /// Property: a reopened ledger recovers exactly the committed state
    #[test]
    fn prop_persistent_recovery(
        steps in prop::collection::vec((principal_strategy(), command_strategy()), 1..25),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let temp_dir = tempfile::tempdir().unwrap();
            let ledger = create_test_ledger(&temp_dir).await;

            for (caller, command) in steps {
                let _ = match command {
                    Command::CreateTweet { content } => ledger.create_tweet(&caller, content).await.map(|_| ()),
                    Command::EditTweet { id, content } => ledger.edit_tweet(&caller, id, content).await,
                    Command::DeleteTweet { id } => ledger.delete_tweet(&caller, id).await,
                    Command::Deposit { amount } => ledger.deposit(&caller, amount).await,
                    Command::Withdraw => ledger.withdraw(&caller).await.map(|_| ()),
                };
            }

            let tweets = ledger.get_tweets().await.unwrap();
            let balance = ledger.balance().await.unwrap();
            let events = ledger.verify_audit_chain().unwrap();
            ledger.shutdown().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;

            let reopened = create_test_ledger(&temp_dir).await;
            prop_assert_eq!(reopened.get_tweets().await.unwrap(), tweets);
            prop_assert_eq!(reopened.balance().await.unwrap(), balance);
            prop_assert_eq!(reopened.summary().await.unwrap().event_count, events);

            reopened.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
