use std::sync::{Arc, Mutex, PoisonError, Weak};

use client_core::ServiceRegistry;
use event_bus::{Channel, EventBus};
use shared::{domain::RESULT_OK, paging::NO_MORE_PAGES};
use tokio::runtime::Handle;
use tracing::{info, warn};
use view_model::{LoadState, Model, ViewModel};

use crate::api::{Article, ArticleApi};

#[derive(Default)]
pub struct ArticlesModel {
    loaded: Mutex<Vec<Article>>,
}

impl ArticlesModel {
    fn append(&self, items: Vec<Article>) -> Vec<Article> {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        loaded.extend(items);
        loaded.clone()
    }
}

impl Model for ArticlesModel {
    fn on_cleared(&self) {
        let loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        info!(count = loaded.len(), "articles model cleared");
    }
}

/// Pages through the article listing until the last page, then finishes the screen.
pub struct ArticlesViewModel {
    base: ViewModel<ArticlesModel>,
    api: Arc<ArticleApi>,
    page_size: u32,
    max_pages: Option<i32>,
    articles: Channel<Vec<Article>>,
    this: Weak<Self>,
}

impl ArticlesViewModel {
    pub fn new(
        bus: EventBus,
        runtime: Handle,
        page_size: u32,
        max_pages: Option<i32>,
    ) -> anyhow::Result<Arc<Self>> {
        let api = ServiceRegistry::global().get_default_service::<ArticleApi>()?;
        let articles = bus.declare(true);
        Ok(Arc::new_cyclic(|this| Self {
            base: ViewModel::new(bus, runtime, ArticlesModel::default()),
            api,
            page_size,
            max_pages,
            articles,
            this: this.clone(),
        }))
    }

    pub fn base(&self) -> &ViewModel<ArticlesModel> {
        &self.base
    }

    /// Sticky listing of everything loaded so far.
    pub fn articles(&self) -> &Channel<Vec<Article>> {
        &self.articles
    }

    pub fn start(&self) {
        self.base.show_default_loading();
        self.load_page();
    }

    fn load_page(&self) {
        let page = self.base.page_index();
        let api = Arc::clone(&self.api);
        let size = self.page_size;
        let (on_page, on_failure) = (self.this.clone(), self.this.clone());

        self.base.page_launch(
            async move { api.list(page, size).await.map(Some) },
            None,
            move |failure| {
                if let Some(vm) = on_failure.upgrade() {
                    warn!(code = failure.code, "article page failed: {failure}");
                    vm.base.dismiss_loading();
                    vm.base.show_load_state(LoadState::Error(failure.to_string()));
                    vm.base.load_more_fail();
                    vm.base.finish(Some(failure.code), None);
                }
            },
            move |page| {
                if let Some(vm) = on_page.upgrade() {
                    vm.on_page(page);
                }
            },
        );
    }

    fn on_page(&self, page: shared::envelope::Page<Article>) {
        let loaded = self.base.model().append(page.items);
        info!(index = page.index, pages = page.pages, total = page.total, loaded = loaded.len(), "article page loaded");
        self.base.bus().post(&self.articles, loaded);

        let next = self.base.next_page(page.pages);
        let capped = self.max_pages.is_some_and(|max| next > max);
        if next == NO_MORE_PAGES || capped {
            self.base.load_more_end();
            self.base.dismiss_loading();
            self.base.show_load_success();
            self.base.finish(Some(RESULT_OK), None);
        } else {
            self.base.load_more_complete();
            self.load_page();
        }
    }
}

impl Drop for ArticlesViewModel {
    fn drop(&mut self) {
        self.base.bus().retire(self.articles.key());
    }
}
