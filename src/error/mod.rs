mod app;
mod auth;
mod config;
mod crew;
mod protocol;
mod transaction;
mod transport;
mod url;
mod validation;

pub use app::{AppError, AppResult};
pub use auth::AuthError;
pub use config::ConfigError;
pub use crew::CrewError;
pub use protocol::ProtocolError;
pub use transaction::TransactionError;
pub use transport::TransportError;
pub use url::UrlError;
pub use validation::ValidationError;
