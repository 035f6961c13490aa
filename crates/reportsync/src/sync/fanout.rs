//! Resolving an account into the dimensions a task iterates over.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entity::dimension_kind::DimensionKind;
use crate::platform::AccountInfo;

use super::error::Result;

/// Which sub-entities a task fans out over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutKind {
    /// One run per account.
    #[default]
    None,
    Store,
    Seller,
    Shop,
    /// One run per `(store, currency)` pair.
    StoreCurrency,
}

impl FanoutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FanoutKind::None => "none",
            FanoutKind::Store => "store",
            FanoutKind::Seller => "seller",
            FanoutKind::Shop => "shop",
            FanoutKind::StoreCurrency => "store_currency",
        }
    }
}

impl std::fmt::Display for FanoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered sub-entity of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionEntry {
    pub value: String,
    /// Owning store, for currencies.
    pub parent: Option<String>,
}

impl DimensionEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// A resolved fan-out dimension.
///
/// The key is `kind=value` pairs joined with `;`, e.g. `store=12;currency=USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    parts: Vec<(DimensionKind, String)>,
}

impl Dimension {
    pub fn single(kind: DimensionKind, value: impl Into<String>) -> Self {
        Self {
            parts: vec![(kind, value.into())],
        }
    }

    pub fn pair(
        first: (DimensionKind, impl Into<String>),
        second: (DimensionKind, impl Into<String>),
    ) -> Self {
        Self {
            parts: vec![(first.0, first.1.into()), (second.0, second.1.into())],
        }
    }

    /// Value of one component.
    pub fn get(&self, kind: DimensionKind) -> Option<&str> {
        self.parts
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, v)| v.as_str())
    }

    pub fn parts(&self) -> &[(DimensionKind, String)] {
        &self.parts
    }

    pub fn key(&self) -> String {
        self.parts
            .iter()
            .map(|(kind, value)| format!("{}={}", kind, value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Read-only source of accounts and their sub-entities.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Active accounts, in a stable order.
    async fn active_accounts(&self) -> Result<Vec<AccountInfo>>;

    /// Sub-entities of one kind registered for an account.
    async fn dimensions(&self, account_id: &str, kind: DimensionKind)
    -> Result<Vec<DimensionEntry>>;
}

/// Resolves accounts into the ordered, deduplicated dimensions of a task.
pub struct FanoutEnumerator<'a> {
    directory: &'a dyn Directory,
}

impl<'a> FanoutEnumerator<'a> {
    pub fn new(directory: &'a dyn Directory) -> Self {
        Self { directory }
    }

    /// Dimensions to iterate for `account`.
    ///
    /// Tasks without fan-out yield a single `None`. An empty list means the
    /// account has nothing to sync for this task.
    pub async fn enumerate(
        &self,
        account_id: &str,
        fanout: FanoutKind,
    ) -> Result<Vec<Option<Dimension>>> {
        let dimensions = match fanout {
            FanoutKind::None => return Ok(vec![None]),
            FanoutKind::Store => self.singles(account_id, DimensionKind::Store).await?,
            FanoutKind::Seller => self.singles(account_id, DimensionKind::Seller).await?,
            FanoutKind::Shop => self.singles(account_id, DimensionKind::Shop).await?,
            FanoutKind::StoreCurrency => {
                let entries = self
                    .directory
                    .dimensions(account_id, DimensionKind::Currency)
                    .await?;
                let mut pairs = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry.parent.filter(|p| !p.is_empty()) {
                        Some(store) => pairs.push(Dimension::pair(
                            (DimensionKind::Store, store),
                            (DimensionKind::Currency, entry.value),
                        )),
                        None => tracing::warn!(
                            account = account_id,
                            currency = %entry.value,
                            "Currency has no store, skipping"
                        ),
                    }
                }
                pairs
            }
        };

        let mut seen = HashSet::with_capacity(dimensions.len());
        Ok(dimensions
            .into_iter()
            .filter(|d| seen.insert(d.key()))
            .map(Some)
            .collect())
    }

    async fn singles(&self, account_id: &str, kind: DimensionKind) -> Result<Vec<Dimension>> {
        let entries = self.directory.dimensions(account_id, kind).await?;
        Ok(entries
            .into_iter()
            .filter(|e| !e.value.is_empty())
            .map(|e| Dimension::single(kind, e.value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::sync::error::SyncError;

    struct StaticDirectory {
        dims: HashMap<DimensionKind, Vec<DimensionEntry>>,
    }

    #[async_trait]
    impl Directory for StaticDirectory {
        async fn active_accounts(&self) -> Result<Vec<AccountInfo>> {
            Ok(vec![AccountInfo::new("acct-1", "Main")])
        }

        async fn dimensions(
            &self,
            _account_id: &str,
            kind: DimensionKind,
        ) -> Result<Vec<DimensionEntry>> {
            self.dims
                .get(&kind)
                .cloned()
                .ok_or_else(|| SyncError::directory("unreachable"))
        }
    }

    fn directory() -> StaticDirectory {
        let mut dims = HashMap::new();
        dims.insert(
            DimensionKind::Store,
            vec![
                DimensionEntry::new("12"),
                DimensionEntry::new("7"),
                DimensionEntry::new("12"),
            ],
        );
        dims.insert(
            DimensionKind::Currency,
            vec![
                DimensionEntry::new("USD").with_parent("12"),
                DimensionEntry::new("EUR"),
                DimensionEntry::new("EUR").with_parent("7"),
            ],
        );
        dims.insert(DimensionKind::Shop, Vec::new());
        StaticDirectory { dims }
    }

    #[tokio::test]
    async fn test_no_fanout_yields_single_implicit_dimension() {
        let dir = directory();
        let dims = FanoutEnumerator::new(&dir)
            .enumerate("acct-1", FanoutKind::None)
            .await
            .unwrap();
        assert_eq!(dims, vec![None]);
    }

    #[tokio::test]
    async fn test_store_fanout_dedupes_in_order() {
        let dir = directory();
        let keys: Vec<String> = FanoutEnumerator::new(&dir)
            .enumerate("acct-1", FanoutKind::Store)
            .await
            .unwrap()
            .into_iter()
            .flatten()
            .map(|d| d.key())
            .collect();
        assert_eq!(keys, vec!["store=12", "store=7"]);
    }

    #[tokio::test]
    async fn test_store_currency_pairs_skip_orphans() {
        let dir = directory();
        let dims = FanoutEnumerator::new(&dir)
            .enumerate("acct-1", FanoutKind::StoreCurrency)
            .await
            .unwrap();
        let keys: Vec<String> = dims.iter().flatten().map(Dimension::key).collect();
        assert_eq!(keys, vec!["store=12;currency=USD", "store=7;currency=EUR"]);

        let first = dims[0].as_ref().unwrap();
        assert_eq!(first.get(DimensionKind::Store), Some("12"));
        assert_eq!(first.get(DimensionKind::Currency), Some("USD"));
        assert_eq!(first.get(DimensionKind::Shop), None);
    }

    #[tokio::test]
    async fn test_zero_dimensions_is_empty_not_error() {
        let dir = directory();
        let dims = FanoutEnumerator::new(&dir)
            .enumerate("acct-1", FanoutKind::Shop)
            .await
            .unwrap();
        assert!(dims.is_empty());
    }

    #[tokio::test]
    async fn test_directory_errors_propagate() {
        let dir = directory();
        let err = FanoutEnumerator::new(&dir)
            .enumerate("acct-1", FanoutKind::Seller)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Directory { .. }));
    }
}
