//! Storage areas: the durable key/value collaborators behind the gateway.
//!
//! An area either speaks futures directly ([`StorageArea`]) or reports
//! completion through a callback ([`CallbackArea`]). The calling convention is
//! fixed when the area is configured: callback areas are wrapped in a
//! [`CallbackAdapter`] before being handed to the gateway.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::{fs, sync::oneshot};
use tracing::trace;

use crate::{AreaError, Op, model::Snapshot};

/// A key/value storage area with a future-based calling convention.
#[async_trait]
pub trait StorageArea: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether this area implements `op`. Unsupported areas are skipped.
    fn supports(&self, _op: Op) -> bool {
        true
    }

    /// Read `keys`; missing keys are simply absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<Snapshot, AreaError>;

    /// Write every pair in `items`, leaving other keys untouched.
    async fn set(&self, items: Snapshot) -> Result<(), AreaError>;
}

/// Completion callback handed to a [`CallbackArea`].
pub type Completion<T> = Box<dyn FnOnce(Result<T, AreaError>) + Send>;

/// A key/value storage area that reports results through a completion callback.
pub trait CallbackArea: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether this area implements `op`.
    fn supports(&self, _op: Op) -> bool {
        true
    }

    /// Read `keys` and invoke `done` exactly once with the result.
    fn get(&self, keys: Vec<String>, done: Completion<Snapshot>);

    /// Write `items` and invoke `done` exactly once with the result.
    fn set(&self, items: Snapshot, done: Completion<()>);
}

/// Presents a [`CallbackArea`] as a future-based [`StorageArea`].
pub struct CallbackAdapter<A> {
    /// Wrapped callback area.
    inner: A,
}

impl<A: CallbackArea> CallbackAdapter<A> {
    /// Wrap a callback-based area.
    pub fn new(inner: A) -> Self {
        Self { inner }
    }

    /// Build a completion that forwards its result into a oneshot channel.
    fn completion<T: Send + 'static>(
        &self,
        tx: oneshot::Sender<Result<T, AreaError>>,
    ) -> Completion<T> {
        let name = self.inner.name().to_string();
        Box::new(move |result| {
            if tx.send(result).is_err() {
                trace!(area = %name, "storage_completion_unobserved");
            }
        })
    }

    /// Await a completion, treating a dropped callback as an area failure.
    async fn wait<T>(
        &self,
        rx: oneshot::Receiver<Result<T, AreaError>>,
    ) -> Result<T, AreaError> {
        rx.await.map_err(|_| {
            AreaError::new(
                self.inner.name(),
                "completion callback dropped without a result",
            )
        })?
    }
}

#[async_trait]
impl<A: CallbackArea> StorageArea for CallbackAdapter<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn supports(&self, op: Op) -> bool {
        self.inner.supports(op)
    }

    async fn get(&self, keys: &[&str]) -> Result<Snapshot, AreaError> {
        let (tx, rx) = oneshot::channel();
        let keys = keys.iter().map(|k| (*k).to_string()).collect();
        self.inner.get(keys, self.completion(tx));
        self.wait(rx).await
    }

    async fn set(&self, items: Snapshot) -> Result<(), AreaError> {
        let (tx, rx) = oneshot::channel();
        self.inner.set(items, self.completion(tx));
        self.wait(rx).await
    }
}

/// In-process area backed by a map.
///
/// Counts calls and can be told to fail or to refuse an operation, which makes
/// it the workhorse of the test suite as well as the stand-in synced area.
pub struct MemoryArea {
    /// Area name.
    name: String,
    /// Stored values.
    data: Mutex<Snapshot>,
    /// Operations this area does not implement.
    unsupported: Vec<Op>,
    /// Fail every `get` when set.
    fail_get: AtomicBool,
    /// Fail every `set` when set.
    fail_set: AtomicBool,
    /// Number of `get` calls received.
    gets: AtomicUsize,
    /// Number of `set` calls received.
    sets: AtomicUsize,
}

impl MemoryArea {
    /// Create an empty area.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_data(name, Snapshot::new())
    }

    /// Create an area pre-populated with `data`.
    pub fn with_data(name: impl Into<String>, data: Snapshot) -> Self {
        Self {
            name: name.into(),
            data: Mutex::new(data),
            unsupported: Vec::new(),
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
        }
    }

    /// Mark `op` as unsupported by this area.
    pub fn without(mut self, op: Op) -> Self {
        self.unsupported.push(op);
        self
    }

    /// Make every subsequent `op` call fail (or succeed again).
    pub fn fail(&self, op: Op, failing: bool) {
        match op {
            Op::Get => self.fail_get.store(failing, Ordering::SeqCst),
            Op::Set => self.fail_set.store(failing, Ordering::SeqCst),
        }
    }

    /// Number of `get` calls seen so far, including failed ones.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls seen so far, including failed ones.
    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Copy of the stored values.
    pub fn snapshot(&self) -> Snapshot {
        self.data.lock().clone()
    }

    /// Store a single value directly, bypassing call accounting.
    pub fn insert(&self, key: &str, value: Value) {
        self.data.lock().insert(key.to_string(), value);
    }
}

#[async_trait]
impl StorageArea for MemoryArea {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, op: Op) -> bool {
        !self.unsupported.contains(&op)
    }

    async fn get(&self, keys: &[&str]) -> Result<Snapshot, AreaError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(AreaError::new(&self.name, "get refused"));
        }
        let data = self.data.lock();
        Ok(keys
            .iter()
            .filter_map(|k| data.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, items: Snapshot) -> Result<(), AreaError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(AreaError::new(&self.name, "set refused"));
        }
        self.data.lock().extend(items);
        Ok(())
    }
}

/// Durable area persisted as a single JSON object file.
///
/// A missing file reads as empty. Writes merge into the current contents and
/// replace the file via a temporary sibling so a crash never leaves a torn file.
pub struct JsonFileArea {
    /// Area name.
    name: String,
    /// Backing file.
    path: PathBuf,
}

impl JsonFileArea {
    /// Create an area backed by `path`. The file is created on first write.
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            name: name.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Map an I/O or parse failure into an area error.
    fn err(&self, what: &str, e: impl ToString) -> AreaError {
        AreaError::new(
            &self.name,
            format!("{what} {}: {}", self.path.display(), e.to_string()),
        )
    }

    /// Read the whole file as an object.
    async fn read_all(&self) -> Result<Snapshot, AreaError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::new()),
            Err(e) => return Err(self.err("read", e)),
        };
        if text.trim().is_empty() {
            return Ok(Snapshot::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(self.err("parse", "top level is not an object")),
            Err(e) => Err(self.err("parse", e)),
        }
    }
}

#[async_trait]
impl StorageArea for JsonFileArea {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, keys: &[&str]) -> Result<Snapshot, AreaError> {
        let mut all = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|k| all.remove(*k).map(|v| ((*k).to_string(), v)))
            .collect())
    }

    async fn set(&self, items: Snapshot) -> Result<(), AreaError> {
        let mut all = self.read_all().await?;
        all.extend(items);
        let text = serde_json::to_string_pretty(&Value::Object(all))
            .map_err(|e| self.err("encode", e))?;
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| self.err("create directory for", e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .await
            .map_err(|e| self.err("write", e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.err("replace", e))?;
        Ok(())
    }
}
