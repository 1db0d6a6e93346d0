use std::marker::PhantomData;
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{MemoryStorage, Result, Storage, StorageError};
use crate::models::{Alert, Certification, Farmer, Prediction};

/// A JSON document stored under `<COLLECTION>/<id>`.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
}

/// Typed view over one collection of a [`Storage`] backend.
///
/// Every mutation takes the write lock shared by all collections of the
/// owning [`Database`]. The lock is not reentrant: closures passed to
/// [`Collection::update`] must not call back into the database.
pub struct Collection<T: Document> {
    storage: Arc<dyn Storage>,
    write_lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Collection<T> {
    fn new(storage: Arc<dyn Storage>, write_lock: Arc<Mutex<()>>) -> Self {
        Self {
            storage,
            write_lock,
            _marker: PhantomData,
        }
    }

    fn doc_key(id: &str) -> Vec<u8> {
        format!("{}/{}", T::COLLECTION, id).into_bytes()
    }

    fn index_key(field: &str, value: &str) -> Vec<u8> {
        format!("idx/{}/{}/{}", T::COLLECTION, field, value).into_bytes()
    }

    async fn write(&self, doc: &T) -> Result<()> {
        let bytes = serde_json::to_vec(doc)?;
        self.storage.put(&Self::doc_key(doc.id()), &bytes).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        match self.storage.get(&Self::doc_key(id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetch several documents, silently skipping ids that do not resolve.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<T>> {
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get(id).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// Store a new document. Fails with `Duplicate` if the id is taken.
    pub async fn insert(&self, doc: &T) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.storage.exists(&Self::doc_key(doc.id())).await? {
            return Err(StorageError::Duplicate(format!(
                "{}/{}",
                T::COLLECTION,
                doc.id()
            )));
        }
        self.write(doc).await
    }

    /// Store a new document and claim the given unique index entries
    /// atomically with respect to other writers.
    pub async fn insert_unique(&self, doc: &T, unique: &[(&str, &str)]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        for (field, value) in unique {
            if self.storage.exists(&Self::index_key(field, value)).await? {
                return Err(StorageError::Duplicate(format!("{}={}", field, value)));
            }
        }
        self.write(doc).await?;
        for (field, value) in unique {
            self.storage
                .put(&Self::index_key(field, value), doc.id().as_bytes())
                .await?;
        }
        debug!("Inserted {}/{}", T::COLLECTION, doc.id());
        Ok(())
    }

    /// Resolve a unique index entry to its document.
    pub async fn find_unique(&self, field: &str, value: &str) -> Result<Option<T>> {
        let id = match self.storage.get(&Self::index_key(field, value)).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map_err(|e| StorageError::InvalidData(e.to_string()))?,
            None => return Ok(None),
        };
        self.get(&id).await
    }

    /// Replace a document wholesale.
    pub async fn save(&self, doc: &T) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(doc).await
    }

    /// Read, modify and write back one document. Returns the updated
    /// document, or `None` when the id does not exist.
    pub async fn update<F>(&self, id: &str, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut T),
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = match self.get(id).await? {
            Some(doc) => doc,
            None => return Ok(None),
        };
        f(&mut doc);
        self.write(&doc).await?;
        Ok(Some(doc))
    }

    pub async fn all(&self) -> Result<Vec<T>> {
        let prefix = format!("{}/", T::COLLECTION);
        let keys = self.storage.list_keys(prefix.as_bytes()).await?;
        let mut docs = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.storage.get(&key).await? {
                docs.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(docs)
    }

    /// Full scan filtered by `predicate`.
    pub async fn find<P>(&self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        let mut docs = self.all().await?;
        docs.retain(|doc| predicate(doc));
        Ok(docs)
    }
}

/// The four AURA collections over one storage backend.
pub struct Database {
    storage: Arc<dyn Storage>,
    pub farmers: Collection<Farmer>,
    pub predictions: Collection<Prediction>,
    pub alerts: Collection<Alert>,
    pub certifications: Collection<Certification>,
}

impl Database {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let write_lock = Arc::new(Mutex::new(()));
        Self {
            farmers: Collection::new(storage.clone(), write_lock.clone()),
            predictions: Collection::new(storage.clone(), write_lock.clone()),
            alerts: Collection::new(storage.clone(), write_lock.clone()),
            certifications: Collection::new(storage.clone(), write_lock),
            storage,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub async fn flush(&self) -> Result<()> {
        self.storage.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        slug: String,
        body: String,
    }

    impl Document for Note {
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, slug: &str) -> Note {
        Note {
            id: id.to_string(),
            slug: slug.to_string(),
            body: String::new(),
        }
    }

    fn collection() -> Collection<Note> {
        Collection::new(Arc::new(MemoryStorage::new()), Arc::new(Mutex::new(())))
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let notes = collection();
        notes.insert(&note("1", "a")).await.unwrap();
        assert!(matches!(
            notes.insert(&note("1", "b")).await,
            Err(StorageError::Duplicate(_))
        ));

        let updated = notes
            .update("1", |n| n.body = "hello".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.body, "hello");
        assert_eq!(notes.get("1").await.unwrap().unwrap().body, "hello");
        assert!(notes.update("missing", |_| {}).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_index() {
        let notes = collection();
        notes
            .insert_unique(&note("1", "first"), &[("slug", "first")])
            .await
            .unwrap();
        let err = notes
            .insert_unique(&note("2", "first"), &[("slug", "first")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(_)));
        assert!(notes.get("2").await.unwrap().is_none());

        let found = notes.find_unique("slug", "first").await.unwrap().unwrap();
        assert_eq!(found.id, "1");
        assert!(notes.find_unique("slug", "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_ignores_index_keys() {
        let notes = collection();
        notes
            .insert_unique(&note("1", "x"), &[("slug", "x")])
            .await
            .unwrap();
        notes.insert(&note("2", "y")).await.unwrap();

        assert_eq!(notes.all().await.unwrap().len(), 2);
        let found = notes.find(|n| n.slug == "y").await.unwrap();
        assert_eq!(found, vec![note("2", "y")]);

        let many = notes
            .get_many(&["2".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(many.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_unique_claims() {
        let notes = Arc::new(collection());
        let mut handles = Vec::new();
        for i in 0..8 {
            let notes = notes.clone();
            handles.push(tokio::spawn(async move {
                notes
                    .insert_unique(&note(&i.to_string(), "same"), &[("slug", "same")])
                    .await
                    .is_ok()
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
