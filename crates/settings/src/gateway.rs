//! Uniform get/set over an ordered list of storage areas with fallback.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::{AreaError, Error, Op, Result, area::StorageArea, model::Snapshot};

/// Tries each configured storage area in order until one succeeds.
///
/// Only areas that support the operation take part. The first success wins and
/// later areas are not touched; when every candidate fails the last area error
/// is surfaced as [`Error::StorageOpFailed`].
#[derive(Clone, Default)]
pub struct StorageGateway {
    /// Candidate areas, most preferred first.
    areas: Vec<Arc<dyn StorageArea>>,
}

impl StorageGateway {
    /// Append a lower-priority area.
    pub fn with_area(mut self, area: Arc<dyn StorageArea>) -> Self {
        self.areas.push(area);
        self
    }

    /// Areas supporting `op`, or `StorageUnavailable` when there are none.
    fn candidates(&self, op: Op) -> Result<Vec<&Arc<dyn StorageArea>>> {
        let found: Vec<_> = self.areas.iter().filter(|a| a.supports(op)).collect();
        if found.is_empty() {
            return Err(Error::StorageUnavailable(op));
        }
        Ok(found)
    }

    /// Read `keys` from the first area that answers.
    pub async fn get(&self, keys: &[&str]) -> Result<Snapshot> {
        let mut last = None;
        for area in self.candidates(Op::Get)? {
            match area.get(keys).await {
                Ok(snapshot) => {
                    trace!(area = area.name(), keys = snapshot.len(), "storage_get");
                    return Ok(snapshot);
                }
                Err(e) => {
                    warn!(area = area.name(), error = %e, "storage get failed, retrying");
                    last = Some(e);
                }
            }
        }
        Err(exhausted(Op::Get, last))
    }

    /// Write `items` to the first area that accepts them.
    pub async fn set(&self, items: Snapshot) -> Result<()> {
        let mut last = None;
        for area in self.candidates(Op::Set)? {
            match area.set(items.clone()).await {
                Ok(()) => {
                    trace!(area = area.name(), keys = items.len(), "storage_set");
                    return Ok(());
                }
                Err(e) => {
                    warn!(area = area.name(), error = %e, "storage set failed, retrying");
                    last = Some(e);
                }
            }
        }
        Err(exhausted(Op::Set, last))
    }
}

/// Build the error for an operation that no area completed.
fn exhausted(op: Op, last: Option<AreaError>) -> Error {
    match last {
        Some(source) => Error::StorageOpFailed { op, source },
        // Unreachable: the candidate list is never empty here.
        None => Error::StorageUnavailable(op),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::area::MemoryArea;

    fn item(key: &str, value: serde_json::Value) -> Snapshot {
        let mut s = Snapshot::new();
        s.insert(key.into(), value);
        s
    }

    #[tokio::test]
    async fn falls_back_to_next_area_on_failure() {
        let a = Arc::new(MemoryArea::new("local"));
        let b = Arc::new(MemoryArea::with_data("sync", item("k", json!(2))));
        a.fail(Op::Get, true);
        a.fail(Op::Set, true);
        let gw = StorageGateway::default()
            .with_area(a.clone())
            .with_area(b.clone());

        let got = gw.get(&["k"]).await.unwrap();
        assert_eq!(got.get("k"), Some(&json!(2)));

        gw.set(item("n", json!(true))).await.unwrap();
        assert_eq!(b.snapshot().get("n"), Some(&json!(true)));
        assert_eq!((a.get_calls(), a.set_calls()), (1, 1));
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let a = Arc::new(MemoryArea::with_data("local", item("k", json!(1))));
        let b = Arc::new(MemoryArea::with_data("sync", item("k", json!(2))));
        let gw = StorageGateway::default()
            .with_area(a.clone())
            .with_area(b.clone());

        assert_eq!(gw.get(&["k"]).await.unwrap().get("k"), Some(&json!(1)));
        gw.set(item("k", json!(3))).await.unwrap();
        assert_eq!(a.snapshot().get("k"), Some(&json!(3)));
        assert_eq!(b.snapshot().get("k"), Some(&json!(2)));
        assert_eq!((b.get_calls(), b.set_calls()), (0, 0));
    }

    #[tokio::test]
    async fn all_areas_failing_surfaces_last_error() {
        let a = Arc::new(MemoryArea::new("local"));
        let b = Arc::new(MemoryArea::new("sync"));
        a.fail(Op::Get, true);
        b.fail(Op::Get, true);
        let gw = StorageGateway::default().with_area(a).with_area(b);

        match gw.get(&["k"]).await {
            Err(Error::StorageOpFailed { op, source }) => {
                assert_eq!(op, Op::Get);
                assert_eq!(source.area, "sync");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_areas_is_unavailable() {
        let gw = StorageGateway::default();
        assert!(matches!(
            gw.get(&["k"]).await,
            Err(Error::StorageUnavailable(Op::Get))
        ));
        assert!(matches!(
            gw.set(Snapshot::new()).await,
            Err(Error::StorageUnavailable(Op::Set))
        ));
    }

    #[tokio::test]
    async fn unsupported_areas_are_skipped() {
        let read_only = Arc::new(MemoryArea::new("ro").without(Op::Set));
        let gw = StorageGateway::default().with_area(read_only.clone());
        assert!(matches!(
            gw.set(Snapshot::new()).await,
            Err(Error::StorageUnavailable(Op::Set))
        ));
        assert_eq!(read_only.set_calls(), 0);
        assert!(gw.get(&["k"]).await.unwrap().is_empty());
    }
}
