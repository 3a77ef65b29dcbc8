use anyhow::Result;
use client_core::{HttpService, RemoteService};
use serde::Deserialize;
use shared::envelope::{PageEnvelope, ResponseEnvelope};

#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
}

pub struct ArticleApi {
    http: HttpService,
}

impl RemoteService for ArticleApi {
    fn from_http(http: HttpService) -> Self {
        Self { http }
    }
}

impl ArticleApi {
    pub async fn list(&self, page: i32, size: u32) -> Result<PageEnvelope<Article>> {
        self.http
            .get_json_with_query("articles", &[("page", page.to_string()), ("size", size.to_string())])
            .await
    }

    pub async fn health(&self) -> Result<ResponseEnvelope<String>> {
        self.http.get_json("health").await
    }
}
