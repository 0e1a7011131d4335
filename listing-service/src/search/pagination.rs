//! Pagination Engine: turns the count and page results into a page body.

use common::models::PropertySummary;
use common::response::PaginatedData;

use super::filter::FilterModel;

pub struct Paginator;

impl Paginator {
    /// Assembles the page. A page past the end yields no items and is not an error.
    pub fn assemble(
        filter: &FilterModel,
        total: u64,
        mut items: Vec<PropertySummary>,
    ) -> PaginatedData<PropertySummary> {
        let page = filter.page();
        let page_size = filter.page_size();

        let first_row = u64::from(page - 1) * u64::from(page_size);
        if first_row >= total {
            items.clear();
        }
        items.truncate(page_size as usize);

        PaginatedData::new(items, page, page_size, total)
    }
}
