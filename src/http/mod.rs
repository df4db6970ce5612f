//! HTTP/1.1 transactions over the socket transport.
pub mod auth;
pub mod body;
pub mod cache;
pub mod cookies;
pub mod links;
pub mod request;
pub mod response;
mod runner;


pub use auth::{AuthCodec, AuthTracker, Challenge, Credentials, RealmClass, StandardAuthCodec};
pub use cache::{CacheStore, Validators};
pub use cookies::{CookieJar, CookieOwner};
pub use links::{ExtractedLinks, LinkExtractor};
pub use runner::{FetchKind, HttpRunner, Outcome};
