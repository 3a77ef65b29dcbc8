use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use shared::domain::{FinishRequest, ScreenRequest, ScreenResult};
use tracing::info;
use view_model::{LoadState, ScreenHost};

/// Prints UI changes to stdout and remembers when the screen asked to finish.
#[derive(Default)]
pub struct ConsoleHost {
    finished: AtomicBool,
    result_code: AtomicI32,
}

impl ConsoleHost {
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn result_code(&self) -> i32 {
        self.result_code.load(Ordering::SeqCst)
    }
}

impl ScreenHost for ConsoleHost {
    fn start_screen(&self, request: ScreenRequest) {
        println!("-> open {}", request.route);
    }

    fn finish(&self, request: FinishRequest) {
        if let Some(code) = request.result_code {
            self.result_code.store(code, Ordering::SeqCst);
        }
        info!(result_code = ?request.result_code, "screen finished");
        self.finished.store(true, Ordering::SeqCst);
    }

    fn set_result(&self, result: ScreenResult) {
        self.result_code.store(result.code, Ordering::SeqCst);
    }

    fn show_loading(&self, message: Option<String>) {
        println!("[{}]", message.as_deref().unwrap_or("loading"));
    }

    fn dismiss_loading(&self) {
        println!("[done]");
    }

    fn show_load_state(&self, state: LoadState) {
        match state {
            LoadState::Error(message) => println!("error: {message}"),
            LoadState::Timeout => println!("error: request timed out"),
            LoadState::Empty => println!("nothing to show"),
            other => info!(?other, "load state"),
        }
    }
}
