use super::*;
use crate::cache::InMemoryCache;
use crate::storage::MockPostStore;

const KV: BackendDirective = BackendDirective::PrimaryKv;
const ORM: BackendDirective = BackendDirective::PrimaryOrm;

struct Fixture {
    service: PostService,
    kv: Arc<MockPostStore>,
    orm: Arc<MockPostStore>,
    cache: Arc<InMemoryCache>,
}

fn fixture() -> Fixture {
    let kv = Arc::new(MockPostStore::new());
    let orm = Arc::new(MockPostStore::new());
    let cache = Arc::new(InMemoryCache::new());
    let service = PostService::new(
        Backends::new(kv.clone(), orm.clone()),
        cache.clone(),
        None,
    );
    Fixture {
        service,
        kv,
        orm,
        cache,
    }
}

fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        author_id: "author-1".to_string(),
        ..NewPost::default()
    }
}

#[test]
fn test_cache_keys() {
    assert_eq!(
        list_cache_key(KV, &PageRequest::first(10)),
        "posts:list:PRIMARY_KV:10:start"
    );
    assert_eq!(
        list_cache_key(ORM, &PageRequest::new(None, Some("abc".to_string()))),
        "posts:list:PRIMARY_ORM:20:abc"
    );
    assert_eq!(post_cache_key(KV, "p1"), "posts:PRIMARY_KV:p1");
}

#[tokio::test]
async fn test_create_routes_to_selected_backend() {
    let f = fixture();

    let post = f.service.create(ORM, new_post("Hello")).await.unwrap();

    assert_eq!(f.orm.stored_count().await, 1);
    assert_eq!(f.kv.stored_count().await, 0);
    assert_eq!(f.service.get(ORM, &post.id).await.unwrap(), post);
    assert!(matches!(
        f.service.get(KV, &post.id).await,
        Err(ServiceError::Storage(StorageError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_list_pages_through_all_posts() {
    let f = fixture();
    for i in 0..5 {
        f.service
            .create(KV, new_post(&format!("Post {}", i)))
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut page = PageRequest::first(2);
    loop {
        let envelope = f.service.list(KV, &page).await.unwrap();
        assert!(envelope.items.len() <= 2);
        assert_eq!(envelope.metadata.count, envelope.items.len() as i64);
        seen.extend(envelope.items.into_iter().map(|p| p.id));
        match envelope.next_token {
            Some(token) => page = PageRequest::new(Some(2), Some(token.into_inner())),
            None => break,
        }
    }

    assert_eq!(seen.len(), 5);
    let mut sorted = seen.clone();
    sorted.sort();
    assert_eq!(seen, sorted);
}

#[tokio::test]
async fn test_list_is_served_from_cache() {
    let f = fixture();
    f.service.create(KV, new_post("Cached")).await.unwrap();

    let first = f.service.list(KV, &PageRequest::default()).await.unwrap();
    assert!(f
        .cache
        .contains(&list_cache_key(KV, &PageRequest::default()))
        .await);

    // The store is down, but the cached page still answers
    f.kv.set_fail_on_read(true).await;
    let second = f.service.list(KV, &PageRequest::default()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_create_invalidates_cached_lists() {
    let f = fixture();
    f.service.create(KV, new_post("One")).await.unwrap();
    let before = f.service.list(KV, &PageRequest::default()).await.unwrap();
    assert_eq!(before.items.len(), 1);

    f.service.create(KV, new_post("Two")).await.unwrap();

    let after = f.service.list(KV, &PageRequest::default()).await.unwrap();
    assert_eq!(after.items.len(), 2);
}

#[tokio::test]
async fn test_write_clears_every_post_key_but_nothing_else() {
    let f = fixture();
    f.cache
        .set("posts:PRIMARY_ORM:x", "{}".to_string(), None)
        .await
        .unwrap();
    f.cache
        .set("sessions:1", "s".to_string(), None)
        .await
        .unwrap();

    f.service.create(KV, new_post("Any")).await.unwrap();

    assert!(!f.cache.contains("posts:PRIMARY_ORM:x").await);
    assert!(f.cache.contains("sessions:1").await);
}

#[tokio::test]
async fn test_failed_write_keeps_cache() {
    let f = fixture();
    f.service.list(KV, &PageRequest::default()).await.unwrap();
    f.kv.set_fail_on_write(true).await;

    let result = f.service.create(KV, new_post("Nope")).await;

    assert!(matches!(
        result,
        Err(ServiceError::Storage(StorageError::Unavailable(_)))
    ));
    assert!(f
        .cache
        .contains(&list_cache_key(KV, &PageRequest::default()))
        .await);
}

#[tokio::test]
async fn test_update_applies_patch_and_refreshes_get() {
    let f = fixture();
    let post = f.service.create(KV, new_post("Draft title")).await.unwrap();
    f.service.get(KV, &post.id).await.unwrap();

    let patch = PostPatch {
        title: Some("Final title".to_string()),
        ..PostPatch::default()
    };
    let updated = f.service.update(KV, &post.id, patch).await.unwrap();
    assert_eq!(updated.title, "Final title");

    let fetched = f.service.get(KV, &post.id).await.unwrap();
    assert_eq!(fetched.title, "Final title");
}

#[tokio::test]
async fn test_update_missing_post() {
    let f = fixture();
    let result = f.service.update(KV, "missing", PostPatch::default()).await;
    assert!(matches!(
        result,
        Err(ServiceError::Storage(StorageError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let f = fixture();
    let post = f.service.create(ORM, new_post("Short lived")).await.unwrap();
    f.service.get(ORM, &post.id).await.unwrap();

    f.service.delete(ORM, &post.id).await.unwrap();

    assert!(matches!(
        f.service.get(ORM, &post.id).await,
        Err(ServiceError::Storage(StorageError::NotFound(_)))
    ));
    assert!(matches!(
        f.service.delete(ORM, &post.id).await,
        Err(ServiceError::Storage(StorageError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_cache_failure_falls_back_to_store() {
    let f = fixture();
    f.service.create(KV, new_post("Listed")).await.unwrap();
    f.cache.set_fail_on_keys(true).await;

    // Listing keys fails, so invalidation is skipped; the write still succeeds
    let created = f.service.create(KV, new_post("Second")).await.unwrap();
    assert_eq!(f.service.get(KV, &created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_unreadable_cache_entry_is_ignored() {
    let f = fixture();
    let post = f.service.create(KV, new_post("Real")).await.unwrap();
    f.cache
        .set(&post_cache_key(KV, &post.id), "not json".to_string(), None)
        .await
        .unwrap();

    assert_eq!(f.service.get(KV, &post.id).await.unwrap(), post);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let f = fixture();
    let page = PageRequest::new(None, Some("not a token!".to_string()));

    let result = f.service.list(KV, &page).await;

    assert!(matches!(
        result,
        Err(ServiceError::Storage(StorageError::Pagination(
            PaginationError::InvalidToken(_)
        )))
    ));
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let f = fixture();
    let result = f.service.create(KV, new_post("")).await;
    assert!(matches!(
        result,
        Err(ServiceError::Storage(StorageError::Invalid(_)))
    ));
    assert_eq!(f.kv.stored_count().await, 0);
}
