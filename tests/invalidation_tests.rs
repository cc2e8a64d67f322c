//! Integration Tests for the Invalidation Manager
//!
//! Tag, version and expiry invalidation through the public API.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mini_cache::invalidation::{create_invalidation_policy, InvalidationPolicy, LruInvalidation};
use mini_cache::tasks::ExpirySweep;
use mini_cache::{Config, InvalidationManager, ManualClock, PolicyKind};

fn manager(max_size: usize, kind: PolicyKind) -> (InvalidationManager<String, String>, ManualClock) {
    let clock = ManualClock::new();
    let manager = InvalidationManager::with_clock(max_size, kind, Arc::new(clock.clone()));
    (manager, clock)
}

fn s(value: &str) -> String {
    value.to_string()
}

// == Tag Invalidation ==

#[test]
fn test_tag_invalidation_completeness() {
    for kind in PolicyKind::ALL {
        let (manager, _) = manager(10, kind);
        manager.set(s("p:1"), s("one"), None, &["X"]);
        manager.set(s("p:2"), s("two"), None, &["X", "featured"]);
        manager.set(s("p:3"), s("three"), None, &["X"]);
        manager.set(s("other"), s("kept"), None, &[]);

        assert_eq!(manager.invalidate_by_tag("X"), 3, "{}", kind);
        assert_eq!(manager.get(&s("other")), Some(s("kept")));
        assert_eq!(manager.size(), 1);
        assert!(manager.keys_for_tag("featured").is_empty());
        manager.assert_consistent();
    }
}

#[test]
fn test_unknown_tag_removes_nothing() {
    let (manager, _) = manager(10, PolicyKind::Lru);
    manager.set(s("a"), s("1"), None, &["t"]);

    assert_eq!(manager.invalidate_by_tag("missing"), 0);
    assert_eq!(manager.size(), 1);
}

#[test]
fn test_eviction_prunes_tag_buckets() {
    let (manager, _) = manager(2, PolicyKind::Fifo);
    manager.set(s("a"), s("1"), None, &["only-a"]);
    manager.set(s("b"), s("2"), None, &["shared"]);
    manager.set(s("c"), s("3"), None, &["shared"]);

    assert_eq!(manager.tags(), vec![s("shared")]);
    let mut keys = manager.keys_for_tag("shared");
    keys.sort();
    assert_eq!(keys, vec![s("b"), s("c")]);
}

// == Eviction Through Policies ==

#[test]
fn test_lru_manager_keeps_recently_read() {
    let (manager, _) = manager(2, PolicyKind::Lru);
    manager.set(s("a"), s("1"), None, &[]);
    manager.set(s("b"), s("2"), None, &[]);
    manager.get(&s("a"));

    manager.set(s("c"), s("3"), None, &[]);

    assert!(manager.contains(&s("a")));
    assert!(!manager.contains(&s("b")));
}

#[test]
fn test_full_manager_prefers_expired_victims() {
    let (manager, clock) = manager(2, PolicyKind::Lfu);
    manager.set(s("hot"), s("1"), Some(Duration::from_secs(1)), &[]);
    manager.set(s("cold"), s("2"), None, &[]);
    for _ in 0..5 {
        manager.get(&s("hot"));
    }

    clock.advance(Duration::from_secs(2));
    manager.set(s("new"), s("3"), None, &[]);

    assert!(!manager.contains(&s("hot")));
    assert!(manager.contains(&s("cold")));
}

#[test]
fn test_fifo_overwrite_keeps_insertion_slot() {
    let (manager, _) = manager(2, PolicyKind::Fifo);
    manager.set(s("a"), s("1"), None, &[]);
    manager.set(s("b"), s("2"), None, &[]);
    manager.set(s("a"), s("1b"), None, &[]);

    manager.set(s("c"), s("3"), None, &[]);

    assert!(!manager.contains(&s("a")));
    assert_eq!(manager.get(&s("b")), Some(s("2")));
    assert!(manager.contains(&s("c")));
}

#[test]
fn test_lfu_overwrite_keeps_frequency() {
    let (manager, _) = manager(2, PolicyKind::Lfu);
    manager.set(s("a"), s("1"), None, &[]);
    manager.set(s("b"), s("2"), None, &[]);
    for _ in 0..3 {
        manager.get(&s("a"));
    }
    manager.get(&s("b"));
    manager.set(s("a"), s("1b"), None, &[]);

    manager.set(s("c"), s("3"), None, &[]);

    assert_eq!(manager.get(&s("a")), Some(s("1b")));
    assert!(!manager.contains(&s("b")));
    assert!(manager.contains(&s("c")));
}

#[test]
fn test_lru_overwrite_counts_as_use() {
    let (manager, _) = manager(2, PolicyKind::Lru);
    manager.set(s("a"), s("1"), None, &[]);
    manager.set(s("b"), s("2"), None, &[]);
    manager.set(s("a"), s("1b"), None, &[]);

    manager.set(s("c"), s("3"), None, &[]);

    assert!(manager.contains(&s("a")));
    assert!(!manager.contains(&s("b")));
}

#[test]
fn test_custom_policy_object() {
    let policy: Box<dyn InvalidationPolicy<String, String>> = Box::new(LruInvalidation::default());
    let manager = InvalidationManager::with_policy(4, policy);
    manager.set(s("a"), s("1"), None, &[]);

    assert_eq!(manager.stats().policy, "lru");
    assert!(create_invalidation_policy::<String, String>("bogus").is_err());
}

// == Versions ==

#[test]
fn test_version_bump_invalidates_namespace_logically() {
    let (manager, _) = manager(10, PolicyKind::Lru);
    manager.set_versioned(s("user:1"), s("ada"), None, &[], "users");
    manager.set_versioned(s("post:1"), s("hello"), None, &[], "posts");

    assert_eq!(manager.increment_version("users"), 1);

    assert_eq!(manager.get_versioned(&s("user:1"), "users"), None);
    assert_eq!(manager.get_versioned(&s("post:1"), "posts"), Some(s("hello")));
    assert_eq!(manager.size(), 2);

    manager.set_versioned(s("user:1"), s("grace"), None, &[], "users");
    assert_eq!(manager.get_versioned(&s("user:1"), "users"), Some(s("grace")));
}

#[test]
fn test_set_version_moves_counter() {
    let (manager, _) = manager(10, PolicyKind::Lru);
    manager.set_version("ns", 41);

    assert_eq!(manager.increment_version("ns"), 42);
    assert_eq!(manager.version("ns"), 42);
}

// == Expiry ==

#[test]
fn test_expired_entry_is_evicted_on_read() {
    let (manager, clock) = manager(10, PolicyKind::Ttl);
    manager.set(s("k"), s("v"), Some(Duration::from_millis(10)), &["t"]);

    clock.advance(Duration::from_millis(20));

    assert_eq!(manager.get(&s("k")), None);
    assert_eq!(manager.size(), 0);
    assert!(manager.tags().is_empty());
}

#[test]
fn test_ttl_manager_default_ttl_applies_without_explicit_ttl() {
    let (manager, clock) = manager(10, PolicyKind::Ttl);
    manager.set(s("k"), s("v"), None, &["t"]);

    clock.advance(Duration::from_secs(59 * 60));
    assert_eq!(manager.get(&s("k")), Some(s("v")));

    clock.advance(Duration::from_secs(2 * 60));
    assert_eq!(manager.get(&s("k")), None);
    assert!(manager.tags().is_empty());
}

#[test]
fn test_huge_ttl_never_expires_in_manager() {
    for kind in PolicyKind::ALL {
        let (manager, clock) = manager(2, kind);
        manager.set(s("a"), s("1"), Some(Duration::MAX), &["t"]);

        clock.advance(Duration::from_secs(86_400));

        assert_eq!(manager.get(&s("a")), Some(s("1")), "{}", kind);
        assert_eq!(manager.purge_expired(), 0);

        manager.set(s("b"), s("2"), Some(Duration::MAX), &[]);
        manager.set(s("c"), s("3"), Some(Duration::MAX), &[]);
        assert_eq!(manager.size(), 2, "{}", kind);
        manager.assert_consistent();
    }
}

#[test]
fn test_sweep_trait_purges() {
    let (manager, clock) = manager(10, PolicyKind::Fifo);
    manager.set(s("k"), s("v"), Some(Duration::from_millis(10)), &[]);
    clock.advance(Duration::from_millis(20));

    let sweep: &dyn ExpirySweep = &manager;
    assert_eq!(sweep.purge_expired(), 1);
}

#[test]
fn test_invalidate_all_then_reuse() {
    let (manager, _) = manager(3, PolicyKind::Lru);
    manager.set(s("a"), s("1"), None, &["t"]);
    manager.set(s("b"), s("2"), None, &["t"]);

    assert_eq!(manager.invalidate_all(), 2);
    manager.set(s("c"), s("3"), None, &["t"]);
    assert_eq!(manager.keys_for_tag("t"), vec![s("c")]);
}

#[test]
fn test_from_config() {
    let config = Config::from_json_str(r#"{"max_entries": 5, "policy": "lfu"}"#).unwrap();
    let manager: InvalidationManager<String, String> = InvalidationManager::from_config(&config);

    let stats = manager.stats();
    assert_eq!(stats.max_size, 5);
    assert_eq!(stats.policy, "lfu");
    assert_eq!(
        serde_json::to_value(&stats).unwrap()["tag_count"],
        serde_json::json!(0)
    );
}

#[test]
fn test_from_config_default_ttl_reaches_ttl_manager() {
    let config =
        Config::from_json_str(r#"{"max_entries": 5, "policy": "ttl", "default_ttl": 30}"#).unwrap();
    let policy = config
        .policy
        .invalidation_policy::<String, String>(config.expiry, config.default_ttl);
    let clock = ManualClock::new();
    let manager = InvalidationManager::with_policy_and_clock(5, policy, Arc::new(clock.clone()));
    manager.set(s("k"), s("v"), None, &[]);

    clock.advance(Duration::from_secs(31));

    assert_eq!(manager.get(&s("k")), None);
}

// == Concurrency ==

#[test]
fn test_concurrent_tagging_stays_consistent() {
    let (manager, _) = manager(64, PolicyKind::Lru);
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let manager = manager.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    let tag = if i % 2 == 0 { "even" } else { "odd" };
                    manager.set(format!("{}:{}", worker, i), s("v"), None, &[tag]);
                    if i % 50 == 0 {
                        manager.invalidate_by_tag("odd");
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    manager.assert_consistent();
    assert!(manager.size() <= 64);
}

// == Background Sweep ==

#[tokio::test]
async fn test_cleanup_task_sweeps_manager() {
    let manager: InvalidationManager<String, String> = InvalidationManager::new(10, PolicyKind::Ttl);
    manager.set(s("k"), s("v"), Some(Duration::from_millis(5)), &["t"]);

    let handle = mini_cache::spawn_cleanup_task(Arc::new(manager.clone()), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(60)).await;
    handle.abort();

    assert_eq!(manager.size(), 0);
    assert!(manager.tags().is_empty());
}
