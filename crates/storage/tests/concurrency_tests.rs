// Concurrent conditional writes against the same version.

mod common;

use common::{archive_bytes, package_name, populated_backends, space_name, version_number};
use futures::future::join_all;
use pallet_core::ContentHash;
use pallet_storage::StorageError;

#[tokio::test]
async fn test_only_one_conditional_writer_wins() {
    for fixture in populated_backends().await {
        let version = fixture
            .store
            .package(&space_name("s1"), &package_name("alpha"))
            .await
            .unwrap()
            .version(&version_number("1.1.0"))
            .await
            .unwrap();
        let observed = ContentHash::compute(&version.get_content().await.unwrap());

        let writes = (0..8).map(|i| {
            let version = version.clone();
            tokio::spawn(async move {
                version
                    .put_content(
                        archive_bytes("alpha", "1.1.0", &format!("replicas = {i}\n")),
                        Some(observed),
                    )
                    .await
            })
        });

        let results: Vec<_> = join_all(writes)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StorageError::PreconditionFailed(_))))
            .count();

        assert_eq!(winners, 1, "{}", fixture.store.backend_name());
        assert_eq!(conflicts, 7, "{}", fixture.store.backend_name());
    }
}
