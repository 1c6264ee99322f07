//! Hard cap on paging loops.
//!
//! Every paginated fetch keeps its cursor as an explicit value (a next-page
//! URL or token) and calls [`Pager::advance`] once per fetched page, so a
//! runaway or adversarial paging API trips
//! [`FederationError::PaginationLimitExceeded`] instead of looping forever.

use crate::error::{FederationError, FederationResult};

pub const DEFAULT_PAGE_LIMIT: u32 = 1_000;

#[derive(Debug)]
pub struct Pager {
    operation: String,
    limit: u32,
    fetched: u32,
}

impl Pager {
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_limit(operation, DEFAULT_PAGE_LIMIT)
    }

    pub fn with_limit(operation: impl Into<String>, limit: u32) -> Self {
        Self {
            operation: operation.into(),
            limit,
            fetched: 0,
        }
    }

    /// Call once per fetched page, before processing it.
    pub fn advance(&mut self) -> FederationResult<()> {
        if self.fetched >= self.limit {
            return Err(FederationError::PaginationLimitExceeded {
                operation: self.operation.clone(),
                limit: self.limit,
            });
        }
        self.fetched += 1;
        Ok(())
    }

    pub fn pages_fetched(&self) -> u32 {
        self.fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_up_to_the_limit() {
        let mut pager = Pager::with_limit("test.list", 3);
        for _ in 0..3 {
            pager.advance().unwrap();
        }
        assert_eq!(pager.pages_fetched(), 3);
    }

    #[test]
    fn trips_past_the_limit() {
        let mut pager = Pager::with_limit("test.list", 2);
        pager.advance().unwrap();
        pager.advance().unwrap();
        let err = pager.advance().unwrap_err();
        match err {
            FederationError::PaginationLimitExceeded { operation, limit } => {
                assert_eq!(operation, "test.list");
                assert_eq!(limit, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn default_limit_is_generous() {
        let mut pager = Pager::new("test.list");
        for _ in 0..DEFAULT_PAGE_LIMIT {
            pager.advance().unwrap();
        }
        assert!(pager.advance().is_err());
    }
}
