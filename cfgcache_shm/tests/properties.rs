//! Property tests over the public cache surface

use cfgcache_common::domain::CacheDomain;
use cfgcache_shm::{ModuloSlotHasher, SharedCache};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use tempfile::NamedTempFile;

fn open(token: &NamedTempFile) -> SharedCache {
    SharedCache::new(CacheDomain::new(token.path()).with_capacity(64 * 1024))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn put_then_get_returns_value(
        key in "[a-z][a-z0-9._]{0,31}",
        value in vec(any::<u8>(), 0..512),
    ) {
        let token = NamedTempFile::new().unwrap();
        let mut cache = open(&token);
        cache.setup(token.path()).unwrap();

        prop_assert!(cache.put(&key, &value));
        prop_assert_eq!(cache.get(&key), Some(value));

        cache.purge().unwrap();
    }

    #[test]
    fn colliding_keys_stay_retrievable(
        entries in btree_map("[a-z]{1,12}", vec(any::<u8>(), 0..64), 1..16),
    ) {
        let token = NamedTempFile::new().unwrap();
        let mut cache = open(&token).with_hasher(ModuloSlotHasher::new(1));
        cache.setup(token.path()).unwrap();

        for (key, value) in &entries {
            prop_assert!(cache.put(key, value));
        }
        for (key, value) in &entries {
            let cached = cache.get(key);
            prop_assert_eq!(cached.as_ref(), Some(value));
        }
        let first = entries.keys().next().unwrap();
        prop_assert_eq!(cache.colocated_keys(first).len(), entries.len());

        cache.purge().unwrap();
    }

    #[test]
    fn delete_only_removes_its_key(
        entries in btree_map("[a-z]{1,8}", vec(any::<u8>(), 1..32), 2..8),
    ) {
        let token = NamedTempFile::new().unwrap();
        let mut cache = open(&token).with_hasher(ModuloSlotHasher::new(2));
        cache.setup(token.path()).unwrap();

        for (key, value) in &entries {
            prop_assert!(cache.put(key, value));
        }
        let victim = entries.keys().next().unwrap().clone();
        prop_assert!(cache.delete(&victim));
        prop_assert!(!cache.delete(&victim));

        for (key, value) in &entries {
            if *key == victim {
                prop_assert_eq!(cache.get(key), None);
            } else {
                let cached = cache.get(key);
                prop_assert_eq!(cached.as_ref(), Some(value));
            }
        }

        cache.purge().unwrap();
    }
}
