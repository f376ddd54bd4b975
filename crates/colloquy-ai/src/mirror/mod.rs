pub mod document;
pub mod jsonl;

pub use document::DocumentMirror;
pub use jsonl::JsonlMirror;
