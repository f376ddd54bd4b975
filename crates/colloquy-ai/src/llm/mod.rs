pub mod chat;
pub mod echo;

pub use chat::ChatCompletionGenerator;
pub use echo::EchoGenerator;
