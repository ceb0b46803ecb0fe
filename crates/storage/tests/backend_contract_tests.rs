// Behavior every backend must share: hierarchy lookups, listing,
// derived metadata and values, and conditional writes.

mod common;

use bytes::Bytes;
use common::{archive_bytes, package_name, populated_backends, space_name, version_number};
use pallet_core::{ContentHash, ResourceKind};
use pallet_storage::StorageError;

#[tokio::test]
async fn test_space_and_package_listing() {
    for fixture in populated_backends().await {
        let store = &fixture.store;
        let name = store.backend_name();

        let space = store.space(&space_name("s1")).await.unwrap();
        assert_eq!(
            space.list().await.unwrap(),
            vec!["alpha", "beta"],
            "{name}"
        );

        let empty = store.space(&space_name("empty")).await.unwrap();
        assert!(empty.list().await.unwrap().is_empty(), "{name}");
        assert!(empty.version_metadata().await.unwrap().is_empty(), "{name}");

        let alpha = space.package(&package_name("alpha")).await.unwrap();
        assert_eq!(
            alpha.list().await.unwrap(),
            vec!["1.0.0", "1.1.0"],
            "{name}"
        );
    }
}

#[tokio::test]
async fn test_version_metadata_follows_listing_order() {
    for fixture in populated_backends().await {
        let space = fixture.store.space(&space_name("s1")).await.unwrap();
        let ids: Vec<(String, String)> = space
            .version_metadata()
            .await
            .unwrap()
            .into_iter()
            .map(|m| (m.name, m.version))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("alpha".to_string(), "1.0.0".to_string()),
                ("alpha".to_string(), "1.1.0".to_string()),
                ("beta".to_string(), "0.1.0".to_string()),
            ],
            "{}",
            fixture.store.backend_name()
        );
    }
}

#[tokio::test]
async fn test_version_handle_derives_metadata_and_values() {
    for fixture in populated_backends().await {
        let version = fixture
            .store
            .package(&space_name("s1"), &package_name("beta"))
            .await
            .unwrap()
            .version(&version_number("0.1.0"))
            .await
            .unwrap();

        assert_eq!(version.number().as_str(), "0.1.0");
        let metadata = version.metadata().await.unwrap();
        assert_eq!(metadata.name, "beta");
        assert_eq!(metadata.description.as_deref(), Some("beta package"));
        assert_eq!(
            version.values().await.unwrap(),
            Bytes::from_static(b"replicas = 1\n")
        );
    }
}

#[tokio::test]
async fn test_missing_resources_report_their_level() {
    for fixture in populated_backends().await {
        let store = &fixture.store;

        match store.space(&space_name("nope")).await {
            Err(StorageError::NotFound { kind, name }) => {
                assert_eq!(kind, ResourceKind::Space);
                assert_eq!(name, "nope");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("missing space resolved"),
        }

        match store
            .package(&space_name("s1"), &package_name("gamma"))
            .await
        {
            Err(StorageError::NotFound { kind, .. }) => assert_eq!(kind, ResourceKind::Package),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("missing package resolved"),
        }

        let alpha = store
            .package(&space_name("s1"), &package_name("alpha"))
            .await
            .unwrap();
        match alpha.version(&version_number("9.9.9")).await {
            Err(StorageError::NotFound { kind, name }) => {
                assert_eq!(kind, ResourceKind::Version);
                assert_eq!(name, "s1/alpha/9.9.9");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("missing version resolved"),
        }
    }
}

#[tokio::test]
async fn test_conditional_put_content() {
    for fixture in populated_backends().await {
        let version = fixture
            .store
            .package(&space_name("s1"), &package_name("alpha"))
            .await
            .unwrap()
            .version(&version_number("1.0.0"))
            .await
            .unwrap();

        let original = version.get_content().await.unwrap();
        let replacement = archive_bytes("alpha", "1.0.0", "replicas = 3\n");

        let stale = ContentHash::compute(b"something else");
        let err = version
            .put_content(replacement.clone(), Some(stale))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PreconditionFailed(_)));
        assert_eq!(version.get_content().await.unwrap(), original);

        let observed = ContentHash::compute(&original);
        version
            .put_content(replacement.clone(), Some(observed))
            .await
            .unwrap();
        assert_eq!(version.get_content().await.unwrap(), replacement);
        assert_eq!(
            version.values().await.unwrap(),
            Bytes::from_static(b"replicas = 3\n")
        );

        // Unconditional writes always land.
        version.put_content(original.clone(), None).await.unwrap();
        assert_eq!(version.get_content().await.unwrap(), original);
    }
}

#[tokio::test]
async fn test_handles_are_live_views() {
    for fixture in populated_backends().await {
        let package = fixture
            .store
            .package(&space_name("s1"), &package_name("alpha"))
            .await
            .unwrap();
        let first = package.version(&version_number("1.0.0")).await.unwrap();
        let second = package.version(&version_number("1.0.0")).await.unwrap();

        let replacement = archive_bytes("alpha", "1.0.0", "replicas = 5\n");
        first.put_content(replacement.clone(), None).await.unwrap();
        assert_eq!(second.get_content().await.unwrap(), replacement);
    }
}
