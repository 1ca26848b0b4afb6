use garde::Validate;
use revu_dal::{Batch, ListingParams};
use revu_types::claim::{ApiClaim, Authorization as _};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

pub mod category;
pub mod comment;
pub mod genre;
pub mod macros;
pub mod review;
pub mod title;

#[derive(Debug, Clone, Validate, Deserialize)]
#[garde(allow_unvalidated)]
pub struct Paging {
    page: Option<u32>,
    #[garde(range(min = 1, max = 1000))]
    page_size: Option<u32>,
}

impl Paging {
    pub fn into_listing_params(self, default_page_size: u32) -> ListingParams {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size.unwrap_or(default_page_size);
        let offset = (page - 1) * page_size;
        ListingParams::new(offset.into(), page_size.into())
    }

    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.page_size.unwrap_or(default_page_size)
    }
}

/// `?search=` filter for the user/category/genre listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    page: u32,
    page_size: u32,
    total_pages: u32,
    total: u64,
    rows: Vec<T>,
}

impl<T> Page<T>
where
    T: Serialize,
{
    pub fn try_from_batch(
        batch: Batch<T>,
        page_size: u32,
    ) -> Result<Self, std::num::TryFromIntError> {
        Ok(Self {
            page: u32::try_from(batch.offset)? / page_size + 1,
            page_size,
            total_pages: u32::try_from(
                (batch.total + page_size as u64 - 1) / page_size as u64,
            )?,
            total: batch.total,
            rows: batch.rows,
        })
    }

    pub fn from_batch(batch: Batch<T>, page_size: u32) -> Self {
        Self::try_from_batch(batch, page_size).expect("Failed to convert batch to page")
        // As we control the batch, this should never fail
    }
}

/// Write access to an authored resource: the author, a moderator, an admin
/// or a superuser.
pub(crate) fn ensure_author_or_moderator(claim: &ApiClaim, author_id: i64) -> ApiResult<()> {
    if claim.is_moderator() || claim.user_id() == Some(author_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
