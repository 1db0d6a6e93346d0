use chrono::Duration;

use aura_backend::build_storage;
use aura_backend::config::{StorageBackend, StorageConfig};
use aura_backend::models::{Certification, CertificationStatus, Farmer, Location, Role};
use aura_backend::storage::{Database, StorageError};

fn rocksdb_config(dir: &tempfile::TempDir) -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::Rocksdb,
        path: dir.path().join("aura-db"),
    }
}

fn farmer(email: &str) -> Farmer {
    Farmer::new(
        "Kiran",
        email,
        "9123456780",
        "hash".to_string(),
        Role::Farmer,
        Location::origin(),
        Vec::new(),
    )
}

#[tokio::test]
async fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = rocksdb_config(&dir);

    let kiran = farmer("kiran@example.com");
    let mut certification =
        Certification::new(&kiran.id, "maize", 800.0, None, 2.5, Duration::days(365));
    certification.status = CertificationStatus::Certified;

    {
        let db = Database::new(build_storage(&config).unwrap());
        db.farmers
            .insert_unique(&kiran, &[("email", kiran.email.as_str())])
            .await
            .unwrap();
        db.certifications
            .insert_unique(&certification, &[("batchId", certification.batch_id.as_str())])
            .await
            .unwrap();
        db.flush().await.unwrap();
    }

    let db = Database::new(build_storage(&config).unwrap());

    let found = db
        .farmers
        .find_unique("email", "kiran@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, kiran.id);

    let stored = db
        .certifications
        .find_unique("batchId", &certification.batch_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, CertificationStatus::Certified);
    assert_eq!(stored.farmer, kiran.id);

    // The email index persisted as well
    let twin = farmer("kiran@example.com");
    let result = db
        .farmers
        .insert_unique(&twin, &[("email", twin.email.as_str())])
        .await;
    assert!(matches!(result, Err(StorageError::Duplicate(_))));
    assert_eq!(db.farmers.all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_collections_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(build_storage(&rocksdb_config(&dir)).unwrap());

    db.farmers.insert(&farmer("a@example.com")).await.unwrap();
    db.farmers.insert(&farmer("b@example.com")).await.unwrap();

    assert_eq!(db.farmers.all().await.unwrap().len(), 2);
    assert!(db.certifications.all().await.unwrap().is_empty());
    assert!(db.predictions.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_memory_backend_selected() {
    let config = StorageConfig {
        backend: StorageBackend::Memory,
        ..StorageConfig::default()
    };
    let db = Database::new(build_storage(&config).unwrap());
    db.farmers.insert(&farmer("m@example.com")).await.unwrap();
    assert_eq!(db.farmers.all().await.unwrap().len(), 1);
}
