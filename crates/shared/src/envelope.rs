//! Wire shapes of remote responses and their normalization into data or a [`Failure`].

use serde::{Deserialize, Serialize};

use crate::error::Failure;

/// Codes treated as success by [`ApiResponse::is_success`] unless a type overrides it.
pub const SUCCESS_CODES: [i32; 2] = [0, 200];

pub trait ApiResponse {
    type Data;

    fn code(&self) -> Option<i32>;
    fn message(&self) -> Option<&str>;
    fn into_data(self) -> Option<Self::Data>;

    fn is_success(&self) -> bool {
        self.code().is_some_and(|code| SUCCESS_CODES.contains(&code))
    }
}

pub trait PageResponse: ApiResponse {
    type Item;

    fn total(&self) -> i32;
    fn index(&self) -> i32;
    fn pages(&self) -> i32;
    /// Null entries and a missing list both collapse into fewer items.
    fn into_items(self) -> Vec<Self::Item>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ResponseEnvelope<T> {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: Some(SUCCESS_CODES[0]),
            message: None,
            data: Some(data),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T> ApiResponse for ResponseEnvelope<T> {
    type Data = T;

    fn code(&self) -> Option<i32> {
        self.code
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn into_data(self) -> Option<T> {
        self.data
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PageEnvelope<T> {
    #[serde(default)]
    pub code: Option<i32>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Option<T>>>,
    #[serde(default)]
    pub total: i32,
    #[serde(default)]
    pub index: i32,
    #[serde(default, rename = "pageCount", alias = "pages")]
    pub page_count: i32,
}

impl<T> PageEnvelope<T> {
    pub fn ok(items: Vec<T>, total: i32, index: i32, page_count: i32) -> Self {
        Self {
            code: Some(SUCCESS_CODES[0]),
            message: None,
            data: Some(items.into_iter().map(Some).collect()),
            total,
            index,
            page_count,
        }
    }
}

impl<T> ApiResponse for PageEnvelope<T> {
    type Data = Vec<Option<T>>;

    fn code(&self) -> Option<i32> {
        self.code
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn into_data(self) -> Option<Vec<Option<T>>> {
        self.data
    }
}

impl<T> PageResponse for PageEnvelope<T> {
    type Item = T;

    fn total(&self) -> i32 {
        self.total
    }

    fn index(&self) -> i32 {
        self.index
    }

    fn pages(&self) -> i32 {
        self.page_count
    }

    fn into_items(self) -> Vec<T> {
        self.data.into_iter().flatten().flatten().collect()
    }
}

/// One page of results together with its position in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i32,
    pub index: i32,
    pub pages: i32,
}

/// Maps a possibly missing envelope to its payload, or to the failure it describes.
pub fn resolve<R: ApiResponse>(response: Option<R>) -> Result<Option<R::Data>, Failure> {
    let Some(response) = response else {
        return Err(Failure::empty_response());
    };
    if !response.is_success() {
        return Err(Failure::business(
            response.code(),
            response.message().map(str::to_owned),
        ));
    }
    Ok(response.into_data())
}

pub fn resolve_page<R: PageResponse>(response: Option<R>) -> Result<Page<R::Item>, Failure> {
    let Some(response) = response else {
        return Err(Failure::empty_response());
    };
    if !response.is_success() {
        return Err(Failure::business(
            response.code(),
            response.message().map(str::to_owned),
        ));
    }
    let (total, index, pages) = (response.total(), response.index(), response.pages());
    Ok(Page {
        items: response.into_items(),
        total,
        index,
        pages,
    })
}

#[cfg(test)]
#[path = "tests/envelope_tests.rs"]
mod tests;
