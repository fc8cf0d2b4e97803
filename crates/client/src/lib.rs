//! Client core for the component code generator: session state, live
//! history, and the generate-and-save flow, driven by a single event queue.

pub mod app;
pub mod generation;
pub mod history;
pub mod messages;
pub mod proxy_client;
pub mod session;
pub mod view;

pub use app::{App, AppConfig, AppEvent, SubmitError};
pub use view::ViewModel;
