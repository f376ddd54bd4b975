use crate::exchange::Exchange;

/// Append-only, session-scoped log of resolved exchanges.
///
/// The only mutations are [`append`](Self::append) and
/// [`clear`](Self::clear); stored exchanges are never handed out mutably.
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    exchanges: Vec<Exchange>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a terminal exchange and return a reference to the stored copy.
    pub fn append(&mut self, exchange: Exchange) -> &Exchange {
        self.exchanges.push(exchange);
        let last = self.exchanges.len() - 1;
        &self.exchanges[last]
    }

    /// Drop every exchange. Used for the presentation layer's clear action.
    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Exchange> {
        self.exchanges.iter()
    }

    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.last()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Plain-text transcript, one `You:`/`Bot:` pair per exchange.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for exchange in &self.exchanges {
            out.push_str("You: ");
            out.push_str(&exchange.user_message);
            out.push('\n');
            out.push_str("Bot: ");
            out.push_str(&exchange.bot_response);
            out.push('\n');
        }
        out
    }
}

impl<'a> IntoIterator for &'a TranscriptStore {
    type Item = &'a Exchange;
    type IntoIter = std::slice::Iter<'a, Exchange>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
