//! Page-based listing shared by every paginated collection.

use crate::errors::Result;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, Select};
use serde::Deserialize;

/// Requested page, already clamped to the collection's limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u64,
    /// Items per page, at least 1
    pub per_page: u64,
}

impl PageRequest {
    /// Clamps raw query values: page defaults to 1, `per_page` to `default`
    /// and never exceeds `max`.
    #[must_use]
    pub fn new(page: Option<u64>, per_page: Option<u64>, default: u64, max: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default).clamp(1, max),
        }
    }
}

/// Raw `?page=&per_page=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

impl PageQuery {
    /// Clamps to a collection's default and maximum page size.
    #[must_use]
    pub fn to_request(&self, default: u64, max: u64) -> PageRequest {
        PageRequest::new(self.page, self.per_page, default, max)
    }
}

/// One page of a collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub current_page: u64,
    /// Page size used
    pub per_page: u64,
    /// Items across all pages
    pub total: u64,
}

impl<T> Page<T> {
    /// Transforms every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

/// Runs `select` for one page and counts the whole collection.
pub async fn fetch_page<C, E>(db: &C, select: Select<E>, request: PageRequest) -> Result<Page<E::Model>>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let paginator = select.paginate(db, request.per_page);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(request.page - 1).await?;

    Ok(Page {
        items,
        current_page: request.page,
        per_page: request.per_page,
        total,
    })
}
