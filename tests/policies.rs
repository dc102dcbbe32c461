use policy_cache::{
    CachePolicy, LfuCache, LfuConfig, LruCache, LruKCache, RemovableCache, ShardedCache,
    ShardedLfuCache, ShardedLruCache,
};
use std::sync::Arc;
use std::thread;

type Policy = Box<dyn CachePolicy<u32, String>>;

fn all_policies(capacity: usize) -> Vec<(&'static str, Policy)> {
    let aging = LfuConfig::new(capacity).with_max_average_num(8);
    vec![
        ("lru", Box::new(LruCache::<u32, String>::with_capacity(capacity)) as Policy),
        ("lru-k", Box::new(LruKCache::<u32, String>::new(capacity, capacity * 4, 2))),
        ("lfu", Box::new(LfuCache::<u32, String>::with_capacity(capacity))),
        ("lfu-aging", Box::new(LfuCache::<u32, String>::with_config(aging))),
        ("sharded-lru", Box::new(ShardedLruCache::<u32, String>::lru(capacity, 4))),
        ("sharded-lfu", Box::new(ShardedLfuCache::<u32, String>::lfu(capacity, 4, 8))),
    ]
}

#[test]
fn purge_clears_every_policy() {
    for (name, cache) in all_policies(16) {
        // given
        for key in 0..8 {
            cache.put(key, format!("value{key}"));
            cache.put(key, format!("value{key}"));
        }

        // when
        cache.purge();

        // then
        for key in 0..8 {
            assert_eq!(cache.get(&key), None, "{name} kept key {key} after purge");
        }
        assert!(cache.is_empty(), "{name} is not empty after purge");
        assert_eq!(cache.check_invariants(), Ok(()), "{name}");
    }
}

#[test]
fn plain_caches_never_exceed_capacity() {
    let caches: Vec<Box<dyn CachePolicy<u32, String>>> = vec![
        Box::new(LruCache::<u32, String>::with_capacity(5)),
        Box::new(LruKCache::<u32, String>::new(5, 20, 2)),
        Box::new(LfuCache::<u32, String>::with_config(
            LfuConfig::new(5).with_max_average_num(3),
        )),
    ];

    for cache in caches {
        for i in 0..500u32 {
            let key = (i * 7) % 23;
            cache.put(key, key.to_string());
            if i % 3 == 0 {
                cache.get(&(key / 2));
            }
            assert!(cache.len() <= cache.capacity());
        }
        assert_eq!(cache.check_invariants(), Ok(()));
    }
}

#[test]
fn zero_capacity_accepts_nothing() {
    for (name, cache) in all_policies(0) {
        // when
        cache.put(1, String::from("one"));
        cache.put(1, String::from("one"));

        // then
        assert_eq!(cache.get(&1), None, "{name}");
        assert!(cache.is_empty(), "{name}");
    }
}

#[test]
fn default_get_cannot_tell_a_miss_from_a_default_value() {
    for (name, cache) in all_policies(4) {
        // given
        cache.put(1, String::new());
        cache.put(1, String::new());

        // when
        let hit = cache.get_or_default(&1);
        let miss = cache.get_or_default(&2);

        // then
        assert_eq!(hit, miss, "{name}");
        assert_eq!(cache.get(&1), Some(String::new()), "{name}");
        assert_eq!(cache.get(&2), None, "{name}");
    }
}

#[test]
fn removable_caches_forget_removed_keys() {
    let caches: Vec<Box<dyn RemovableCache<u32, u32>>> = vec![
        Box::new(LruCache::<u32, u32>::with_capacity(4)),
        Box::new(LruKCache::<u32, u32>::new(4, 8, 2)),
        Box::new(ShardedLruCache::<u32, u32>::lru(8, 2)),
    ];

    for cache in caches {
        // given
        cache.put(1, 1);
        cache.put(1, 1);
        cache.put(2, 2);
        cache.put(2, 2);

        // when
        cache.remove(&1);
        cache.remove(&3);

        // then
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(2));
        assert_eq!(cache.len(), 1);
    }
}

#[test]
fn sharded_put_then_get_returns_the_value() {
    // given
    let cache: ShardedLfuCache<String, u64> = ShardedCache::lfu(1_024, 8, 1_000);

    for i in 0..200u64 {
        let key = format!("key{i}");

        // when
        cache.put(key.clone(), i);

        // then
        assert_eq!(cache.get(&key), Some(i));
    }
}

#[test]
fn lru_k_resists_scans_better_than_lru() {
    // given
    let lru = LruCache::with_capacity(10);
    let lru_k = LruKCache::new(10, 1_000, 2);
    for key in 0..10u32 {
        for _ in 0..2 {
            lru.put(key, key);
            lru_k.put(key, key);
        }
    }

    // when
    for key in 1_000..1_100u32 {
        lru.put(key, key);
        lru_k.put(key, key);
    }

    // then
    let lru_hits = (0..10u32).filter(|key| lru.get(key).is_some()).count();
    let lru_k_hits = (0..10u32).filter(|key| lru_k.get(key).is_some()).count();
    assert_eq!(lru_hits, 0);
    assert_eq!(lru_k_hits, 10);
}

#[test]
fn policies_are_shareable_between_threads() {
    // given
    let caches: Vec<Arc<dyn CachePolicy<u32, u32> + Send + Sync>> = vec![
        Arc::new(LruCache::<u32, u32>::with_capacity(64)),
        Arc::new(LruKCache::<u32, u32>::new(64, 256, 2)),
        Arc::new(LfuCache::<u32, u32>::with_config(
            LfuConfig::new(64).with_max_average_num(4),
        )),
        Arc::new(ShardedLruCache::<u32, u32>::lru(64, 4)),
        Arc::new(ShardedLfuCache::<u32, u32>::lfu(64, 4, 4)),
    ];

    for cache in caches {
        // when
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000u32 {
                        let key = (i * 31 + t) % 128;
                        cache.put(key, key);
                        if let Some(value) = cache.get(&key) {
                            assert_eq!(value, key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // then
        assert!(cache.len() <= cache.capacity());
        assert_eq!(cache.check_invariants(), Ok(()));
    }
}
