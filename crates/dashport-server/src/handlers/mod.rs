//! HTTP handlers, grouped by area.

pub mod admin;
pub mod auth;
pub mod dashboards;
pub mod embed;
pub mod invitations;

use dashport_core::repository::Pagination;
use serde::Deserialize;

const MAX_PAGE_SIZE: u64 = 200;

/// `?offset=&limit=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        let defaults = Pagination::default();
        Self {
            offset: query.offset.unwrap_or(defaults.offset),
            limit: query.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE_SIZE),
        }
    }
}
