pub mod database;
pub mod http;
pub mod redis;

pub use database::DatabaseChecker;
pub use http::HttpChecker;
pub use self::redis::RedisChecker;
