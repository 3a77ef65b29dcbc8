use serde::{Deserialize, Serialize};

pub const FIRST_PAGE: i32 = 1;
/// Index reported once the last page has been passed.
pub const NO_MORE_PAGES: i32 = -1;

/// Tracks which page of a listing to request next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    index: i32,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self { index: FIRST_PAGE }
    }
}

impl PageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(index: i32) -> Self {
        Self { index }
    }

    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn is_exhausted(&self) -> bool {
        self.index == NO_MORE_PAGES
    }

    /// Moves to the next page, or to [`NO_MORE_PAGES`] once `pages` is passed.
    /// An index already beyond `pages` also ends the listing.
    pub fn advance(&mut self, pages: i32) -> i32 {
        if self.index == NO_MORE_PAGES {
            return self.index;
        }
        if self.index < pages {
            self.index += 1;
        } else {
            self.index = NO_MORE_PAGES;
        }
        self.index
    }

    pub fn reset(&mut self) {
        self.index = FIRST_PAGE;
    }
}

#[cfg(test)]
#[path = "tests/paging_tests.rs"]
mod tests;
