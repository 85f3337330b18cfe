//! Cache refresh points: startup load and delete.

use crate::cache::EncodingCache;
use crate::error::{FaceRecError, StorageError};
use crate::store::EncodingStore;

/// Initialize the store and build the cache from every stored row.
pub fn load_cache<St>(store: &St) -> Result<EncodingCache, StorageError>
where
    St: EncodingStore + ?Sized,
{
    store.initialize()?;
    let rows = store.load_all()?;
    let row_count = rows.len();
    let cache = EncodingCache::from_rows(rows);
    tracing::info!(rows = row_count, identities = cache.len(), "loaded encoding cache");
    Ok(cache)
}

/// Delete every record named `name` from the store and the cache.
///
/// Fails with [`FaceRecError::UserNotFound`] when `name` is not cached; the
/// store is not touched in that case.
pub fn delete_identity<St>(
    store: &St,
    cache: &mut EncodingCache,
    name: &str,
) -> Result<usize, FaceRecError>
where
    St: EncodingStore + ?Sized,
{
    if !cache.contains(name) {
        return Err(FaceRecError::UserNotFound(name.to_string()));
    }

    let removed = store.delete(name)?;
    cache.remove(name);
    tracing::info!(name, rows = removed, "deleted identity");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Encoding;
    use crate::testutil::MemoryStore;
    use crate::types::Identity;

    fn save(store: &MemoryStore, name: &str, v: f32) {
        let id = Identity { name: name.into(), age: 1, email: "x@y".into() };
        store.save(&id, &Encoding::new(vec![v])).unwrap();
    }

    #[test]
    fn test_load_cache_empty_store() {
        let cache = load_cache(&MemoryStore::default()).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_cache_duplicate_names_latest_wins() {
        let store = MemoryStore::default();
        save(&store, "alice", 1.0);
        save(&store, "bob", 2.0);
        save(&store, "alice", 3.0);

        let cache = load_cache(&store).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("alice").unwrap().values, vec![3.0]);
    }

    #[test]
    fn test_delete_identity_removes_all_rows() {
        let store = MemoryStore::default();
        save(&store, "alice", 1.0);
        save(&store, "alice", 2.0);
        save(&store, "bob", 3.0);
        let mut cache = load_cache(&store).unwrap();

        assert_eq!(delete_identity(&store, &mut cache, "alice").unwrap(), 2);
        assert!(!cache.contains("alice"));
        let names: Vec<_> = store.load_all().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["bob"]);
    }

    #[test]
    fn test_delete_unknown_user() {
        let store = MemoryStore::default();
        let mut cache = EncodingCache::new();
        let err = delete_identity(&store, &mut cache, "ghost").unwrap_err();
        assert!(matches!(err, FaceRecError::UserNotFound(name) if name == "ghost"));
    }
}
