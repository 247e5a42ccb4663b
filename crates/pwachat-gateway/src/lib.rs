pub mod app;
pub mod auth;
pub mod dispatch;
pub mod http;
pub mod relay;
pub mod server;
pub mod ws;

pub use app::AppState;
pub use relay::Relay;
pub use server::run;
