//! Terminal presentation adapter.
//!
//! Reads one line per submission, renders each resolved exchange, and maps
//! `/clear`, `/history`, `/help` and `/quit` onto session actions.

use std::io::Write;

use anyhow::Result;
use colloquy_ai::ExchangePipeline;
use colloquy_core::{Exchange, ExchangeError, ExchangeStatus, TranscriptStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HELP: &str = "Commands: /history  show the transcript\n          /clear    start over\n          /quit     leave\n";

/// Events the terminal emits toward the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    Submit(String),
    Clear,
    History,
    Help,
    Quit,
}

pub fn parse_event(line: &str) -> PresentationEvent {
    match line.trim() {
        "/clear" => PresentationEvent::Clear,
        "/history" => PresentationEvent::History,
        "/help" => PresentationEvent::Help,
        "/quit" | "/exit" => PresentationEvent::Quit,
        _ => PresentationEvent::Submit(line.to_string()),
    }
}

pub fn format_exchange(exchange: &Exchange) -> String {
    match exchange.status {
        ExchangeStatus::Answered => format!(
            "You: {}\nBot: {}\n",
            exchange.user_message, exchange.bot_response
        ),
        status => format!(
            "You: {}\nBot [{}]: {}\n",
            exchange.user_message, status, exchange.bot_response
        ),
    }
}

/// One interactive session: owns its transcript, borrows the pipeline.
pub struct ChatSession<'p> {
    pipeline: &'p ExchangePipeline,
    store: TranscriptStore,
}

impl<'p> ChatSession<'p> {
    pub fn new(pipeline: &'p ExchangePipeline) -> Self {
        Self {
            pipeline,
            store: TranscriptStore::new(),
        }
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.store
    }

    /// Apply one event. Returns `false` when the session should end.
    pub async fn handle<W: Write>(&mut self, event: PresentationEvent, out: &mut W) -> Result<bool> {
        match event {
            PresentationEvent::Submit(raw) => {
                match self.pipeline.submit(&mut self.store, &raw).await {
                    Ok(exchange) => write!(out, "{}", format_exchange(exchange))?,
                    Err(ExchangeError::EmptyMessage) => {}
                }
            }
            PresentationEvent::Clear => {
                self.store.clear();
                tracing::info!("Transcript cleared");
                writeln!(out, "(transcript cleared)")?;
            }
            PresentationEvent::History => {
                if self.store.is_empty() {
                    writeln!(out, "(no messages yet)")?;
                } else {
                    writeln!(out, "Chat History")?;
                    write!(out, "{}", self.store.render())?;
                }
            }
            PresentationEvent::Help => write!(out, "{HELP}")?,
            PresentationEvent::Quit => return Ok(false),
        }
        out.flush()?;
        Ok(true)
    }

    /// Drive the session from `input` until EOF or `/quit`.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        write!(out, "> ")?;
        out.flush()?;
        while let Some(line) = lines.next_line().await? {
            if !self.handle(parse_event(&line), out).await? {
                break;
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use colloquy_core::mock::{ScriptedFilter, ScriptedGenerator};

    fn pipeline(reply: &str) -> (ExchangePipeline, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator::replying(reply));
        let pipeline = ExchangePipeline::new(Arc::new(ScriptedFilter::passing()), generator.clone());
        (pipeline, generator)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_event("/clear"), PresentationEvent::Clear);
        assert_eq!(parse_event("  /quit "), PresentationEvent::Quit);
        assert_eq!(parse_event("/exit"), PresentationEvent::Quit);
        assert_eq!(parse_event("/history"), PresentationEvent::History);
        assert_eq!(
            parse_event("hello /clear"),
            PresentationEvent::Submit("hello /clear".into())
        );
    }

    #[test]
    fn blocked_exchange_shows_status() {
        let ex = Exchange::resolved(
            "rude",
            "Your message was blocked for: profanity",
            ExchangeStatus::BlockedInput,
            vec!["profanity".into()],
        );
        let text = format_exchange(&ex);
        assert!(text.contains("Bot [BLOCKED_INPUT]: Your message was blocked for: profanity"));
    }

    #[tokio::test]
    async fn session_submits_and_clears() {
        let (pipeline, _) = pipeline("hi there");
        let mut session = ChatSession::new(&pipeline);
        let input = tokio::io::BufReader::new(&b"hello\nagain\n/clear\nlast\n/history\n"[..]);
        let mut out = Vec::new();

        session.run(input, &mut out).await.unwrap();

        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript().exchanges()[0].user_message, "last");
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("You: hello\nBot: hi there"));
        assert!(printed.contains("(transcript cleared)"));
        assert!(printed.contains("Chat History\nYou: last\nBot: hi there\n"));
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let (pipeline, generator) = pipeline("ok");
        let mut session = ChatSession::new(&pipeline);
        let input = tokio::io::BufReader::new(&b"\n   \n/quit\nnever sent\n"[..]);
        let mut out = Vec::new();

        session.run(input, &mut out).await.unwrap();

        assert!(session.transcript().is_empty());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn history_does_not_mutate() {
        let (pipeline, _) = pipeline("ok");
        let mut session = ChatSession::new(&pipeline);
        let mut out = Vec::new();

        session
            .handle(PresentationEvent::Submit("one".into()), &mut out)
            .await
            .unwrap();
        let before = session.transcript().exchanges().to_vec();
        session.handle(PresentationEvent::History, &mut out).await.unwrap();
        session.handle(PresentationEvent::History, &mut out).await.unwrap();

        assert_eq!(session.transcript().exchanges(), before.as_slice());
    }
}
