use super::DomainError;

/// A 1-based page window over a ranked result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::InvalidPage(page));
        }
        if per_page == 0 {
            return Err(DomainError::InvalidPageSize(per_page));
        }
        Ok(Self { page, per_page })
    }

    pub fn page(self) -> u64 {
        self.page
    }

    pub fn per_page(self) -> u64 {
        self.per_page
    }

    /// Index of the first hit in the window, `(page - 1) * per_page`.
    pub fn offset(self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(self) -> u64 {
        self.per_page
    }
}

/// One page of search results in rank order.
///
/// `total` is the number of matches reported by the search index, which can
/// exceed the number of rows actually returned when the index and the store
/// have drifted apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> SearchPage<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            request,
        }
    }

    pub fn has_next(&self) -> bool {
        self.total > self.request.page.saturating_mul(self.request.per_page)
    }

    pub fn has_prev(&self) -> bool {
        self.request.page > 1
    }

    pub fn next_page(&self) -> Option<u64> {
        self.has_next().then(|| self.request.page + 1)
    }

    pub fn prev_page(&self) -> Option<u64> {
        self.has_prev().then(|| self.request.page - 1)
    }

    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.request.per_page)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> SearchPage<U> {
        SearchPage {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}
