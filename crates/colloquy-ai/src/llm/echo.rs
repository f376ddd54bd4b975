use async_trait::async_trait;
use colloquy_core::{ResponseGenerator, Unavailable};

/// Offline generator that repeats the prompt back. Used when no
/// generation service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, Unavailable> {
        Ok(format!("You said: '{prompt}'. I heard you!"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt() {
        let reply = EchoGenerator.generate("hello").await.unwrap();
        assert_eq!(reply, "You said: 'hello'. I heard you!");
    }
}
