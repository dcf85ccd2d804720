//! Page window arithmetic for list endpoints

use crate::config::PaginationConfig;
use crate::dto::PaginationDto;
use crate::errors::{AppError, Result};
use serde::Deserialize;

/// Raw `?page=&limit=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A validated `(page, limit)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Validate a 1-based page number and a page size
    pub fn new(page: i64, limit: i64) -> Result<Self> {
        if page < 1 {
            return Err(AppError::InvalidArgument {
                message: format!("page must be >= 1, got {}", page),
            });
        }
        if limit < 1 {
            return Err(AppError::InvalidArgument {
                message: format!("limit must be >= 1, got {}", limit),
            });
        }

        Ok(Self {
            page: page as u64,
            limit: limit as u64,
        })
    }

    /// Validate against an upper bound on the page size as well
    pub fn bounded(page: i64, limit: i64, max_limit: u64) -> Result<Self> {
        let request = Self::new(page, limit)?;
        if request.limit > max_limit {
            return Err(AppError::InvalidArgument {
                message: format!("limit must be <= {}, got {}", max_limit, limit),
            });
        }
        Ok(request)
    }

    /// Fill in configured defaults, then validate
    pub fn from_query(query: PageQuery, config: &PaginationConfig) -> Result<Self> {
        Self::bounded(
            query.page.unwrap_or(1),
            query.limit.unwrap_or(config.default_limit as i64),
            config.max_limit,
        )
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of items that precede this page
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Build the metadata for this window over `total_items`
    pub fn metadata(&self, total_items: u64) -> PaginationDto {
        let total_pages = total_items.div_ceil(self.limit);

        PaginationDto {
            page: self.page,
            limit: self.limit,
            total_items,
            total_pages,
            has_next: self.page < total_pages,
            has_previous: self.page > 1,
        }
    }
}

/// Compute pagination metadata.
///
/// Pages past the end are not clamped; callers get correct metadata and an
/// empty slice.
pub fn paginate(page: i64, limit: i64, total_items: u64) -> Result<PaginationDto> {
    Ok(PageRequest::new(page, limit)?.metadata(total_items))
}
