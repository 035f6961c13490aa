use std::fmt;

use crate::entity::task_type::TaskType;

/// Identity of one sync run target: `(account, task, dimension)`.
///
/// Cursors and records are both partitioned by this key. An empty
/// `dimension_key` means the task has no sub-dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncKey {
    pub account_id: String,
    pub task_type: TaskType,
    pub dimension_key: String,
}

impl SyncKey {
    pub fn new(account_id: impl Into<String>, task_type: TaskType, dimension: Option<&str>) -> Self {
        Self {
            account_id: account_id.into(),
            task_type,
            dimension_key: dimension.unwrap_or_default().to_string(),
        }
    }

    /// Dimension key as an option (empty string means no dimension).
    pub fn dimension(&self) -> Option<&str> {
        if self.dimension_key.is_empty() {
            None
        } else {
            Some(&self.dimension_key)
        }
    }
}

impl fmt::Display for SyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_id, self.task_type)?;
        if let Some(dimension) = self.dimension() {
            write!(f, "[{}]", dimension)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_dimension_only_when_present() {
        let plain = SyncKey::new("acct-1", TaskType::Listings, None);
        assert_eq!(plain.to_string(), "acct-1/listings");
        assert_eq!(plain.dimension(), None);

        let scoped = SyncKey::new("acct-1", TaskType::Orders, Some("store=12"));
        assert_eq!(scoped.to_string(), "acct-1/orders[store=12]");
        assert_eq!(scoped.dimension(), Some("store=12"));
    }
}
