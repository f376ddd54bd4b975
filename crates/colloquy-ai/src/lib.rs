pub mod builder;
pub mod llm;
pub mod mirror;
pub mod moderation;
pub mod pipeline;

pub use builder::build_pipeline;
pub use pipeline::ExchangePipeline;
