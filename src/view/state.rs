use serde::{Deserialize, Serialize};

use super::ViewQuery;

/// Column sort driven by header clicks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: Option<String>,
    pub ascending: bool,
}

impl SortState {
    pub fn by(key: &str, ascending: bool) -> Self {
        Self { key: Some(key.to_string()), ascending }
    }

    /// Same key flips direction; a new key starts ascending
    pub fn toggle(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            self.ascending = !self.ascending;
        } else {
            self.key = Some(key.to_string());
            self.ascending = true;
        }
    }

    pub fn indicator(&self, key: &str) -> &'static str {
        match (&self.key, self.ascending) {
            (Some(k), true) if k == key => " ▲",
            (Some(k), false) if k == key => " ▼",
            _ => "",
        }
    }
}

/// Query, sort and page controls of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    query: String,
    sort: SortState,
    page: usize,
    page_size: usize,
}

impl ListState {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            sort: SortState { key: None, ascending: true },
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn with_sort(mut self, sort: SortState) -> Self {
        self.sort = sort;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// A changed query starts over at page 1
    pub fn set_query(&mut self, query: &str) {
        if self.query != query {
            self.query = query.to_string();
            self.page = 1;
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        let page_size = page_size.max(1);
        if self.page_size != page_size {
            self.page_size = page_size;
            self.page = 1;
        }
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn toggle_sort(&mut self, key: &str) {
        self.sort.toggle(key);
    }

    pub fn to_query(&self) -> ViewQuery {
        ViewQuery {
            query: self.query.clone(),
            sort_key: self.sort.key.clone(),
            sort_asc: self.sort.ascending,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(10)
    }
}
