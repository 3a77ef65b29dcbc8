//! Presentation-logic tier: lifecycle-scoped tasks, result dispatch and the
//! UI-change channels a view model posts on.

pub mod adapter;
pub mod channels;
pub mod scope;
pub mod screen;
mod view_model;

pub use adapter::{launch_flow, settle_page, settle_response, OnSuccess};
pub use channels::{
    ForResultChannels, ListChannels, LoadState, LoadStateChannels, LoadingChannels,
    NavigationChannels,
};
pub use scope::{Settlement, TaskHandle, TaskScope, TaskState};
pub use screen::{ScreenBinding, ScreenHost, ScreenOptions};
pub use view_model::{Model, ViewModel, DEFAULT_LOADING_MESSAGE};
