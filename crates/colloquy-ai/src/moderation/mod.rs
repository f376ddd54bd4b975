pub mod http;
pub mod keyword;

pub use http::HttpModerationFilter;
pub use keyword::{KeywordFilter, TermMatch};
