//! Page and record bookkeeping.
//!
//! A [`Window`] says which slice of the filtered set the caller wants. Once
//! the filtered count is known it resolves to a [`PagePlan`]: the LIMIT to
//! append plus the page bounds, and after the fetch, the record bounds.

use serde::{Deserialize, Serialize};

use crate::config::{LimitSyntax, SearchConfig};
use crate::params::SearchParams;
use crate::{Error, Result};

/// Page numbers around the current page, 1-based.
///
/// `prev` and `next` are absent at the boundaries. `last` is absent when
/// the filtered set is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
   pub first: Option<u64>,
   pub prev: Option<u64>,
   #[serde(rename = "self")]
   pub current: Option<u64>,
   pub next: Option<u64>,
   pub last: Option<u64>,
}

/// Row bounds of the current page within the filtered set.
///
/// `from` and `to` are 1-based and inclusive, both 0 when the page is
/// empty. `total` is the filtered count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordState {
   pub from: u64,
   pub to: u64,
   pub amount: u64,
   pub per_page: u64,
   pub total: u64,
}

/// Requested slice of the filtered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Window {
   /// Everything, as a single page
   All,
   /// `count` rows starting at row `offset` (0-based)
   Rows { count: u64, offset: u64 },
   /// 1-based page of `per_page` rows, checked against the last page
   Page { page: u64, per_page: u64 },
}

impl Window {
   /// Window requested through datatable parameters.
   ///
   /// `displayStart`/`displayLength` win over `page`/`ipp`. A
   /// `displayLength` of `-1`, or none at all, means no limit.
   pub fn from_params(params: &SearchParams, config: &SearchConfig) -> Result<Self> {
      if let Some(start) = params.datatable_number("displayStart")? {
         let offset = u64::try_from(start)
            .map_err(|_| Error::invalid_parameter("displayStart", &start.to_string()))?;

         return match params.datatable_number("displayLength")? {
            None | Some(-1) => Ok(Window::All),
            Some(length) => {
               let count = u64::try_from(length)
                  .map_err(|_| Error::invalid_parameter("displayLength", &length.to_string()))?;
               Window::rows(count, offset, config)
            }
         };
      }

      if let Some(ipp) = params.number("ipp")? {
         let per_page = u64::try_from(ipp).map_err(|_| Error::InvalidPageSize)?;
         let page = match params.number("page")? {
            None => 1,
            Some(page) => u64::try_from(page).map_err(|_| Error::InvalidPageNumber)?,
         };
         return Window::page(page, per_page, config);
      }

      Ok(Window::All)
   }

   /// Validated row window. SQLite takes offsets up to `i64::MAX`.
   pub fn rows(count: u64, offset: u64, config: &SearchConfig) -> Result<Self> {
      let count = config.check_page_size(count)?;
      if i64::try_from(offset).is_err() {
         return Err(Error::invalid_parameter("offset", &offset.to_string()));
      }
      Ok(Window::Rows { count, offset })
   }

   /// Validated 1-based page window.
   pub fn page(page: u64, per_page: u64, config: &SearchConfig) -> Result<Self> {
      let per_page = config.check_page_size(per_page)?;
      if page == 0 {
         return Err(Error::InvalidPageNumber);
      }
      Ok(Window::Page { page, per_page })
   }

   /// Resolve against the filtered count.
   ///
   /// Only [`Window::Page`] can fail: a page past the last one of a
   /// non-empty set is [`Error::PageOutOfRange`]. An empty set accepts any
   /// page.
   pub fn plan(self, filtered: u64) -> Result<PagePlan> {
      match self {
         Window::All => {
            let last = (filtered > 0).then_some(1);
            Ok(PagePlan {
               pages: PageState {
                  first: Some(1),
                  prev: None,
                  current: Some(1),
                  next: None,
                  last,
               },
               offset: 0,
               limit: None,
            })
         }
         Window::Rows { count, offset } => {
            let page = (offset / count)
               .checked_add(1)
               .ok_or_else(|| Error::invalid_parameter("offset", &offset.to_string()))?;
            let last = filtered.div_ceil(count);
            Ok(PagePlan {
               pages: PageState {
                  first: Some(1),
                  prev: (page > 1).then(|| page - 1),
                  current: Some(page),
                  next: (page < last).then(|| page + 1),
                  last: (last > 0).then_some(last),
               },
               offset,
               limit: Some(count),
            })
         }
         Window::Page { page, per_page } => {
            let last = filtered.div_ceil(per_page);
            if filtered > 0 && page > last {
               return Err(Error::PageOutOfRange { page, last });
            }

            let in_range = filtered > 0;
            Ok(PagePlan {
               pages: PageState {
                  first: Some(1),
                  prev: (in_range && page > 1).then(|| page - 1),
                  current: Some(page),
                  next: (in_range && page < last).then(|| page + 1),
                  last: (last > 0).then_some(last),
               },
               offset: if in_range { (page - 1) * per_page } else { 0 },
               limit: Some(per_page),
            })
         }
      }
   }
}

/// A [`Window`] resolved against a filtered count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PagePlan {
   pub pages: PageState,
   pub offset: u64,
   pub limit: Option<u64>,
}

impl PagePlan {
   pub fn limit_clause(&self, syntax: LimitSyntax) -> Option<String> {
      self.limit.map(|count| syntax.render(count, self.offset))
   }

   /// Record bounds once `amount` rows came back out of `total` filtered.
   pub fn records(&self, amount: u64, total: u64) -> RecordState {
      let (from, to) = if amount > 0 {
         (self.offset + 1, self.offset + amount)
      } else {
         (0, 0)
      };

      RecordState {
         from,
         to,
         amount,
         per_page: self.limit.unwrap_or(total),
         total,
      }
   }
}
