//! Console rendering of a live run
//!
//! Prints each message under a speaker header as it arrives, then a labeled
//! status line when the run ends.

use std::io::{self, Write};

use tokio_stream::{Stream, StreamExt};

use crate::agent::{TerminationReason, TranscriptEvent};
use crate::core::{Message, ToolOutcome};

/// Writes transcript events to an output
pub struct Console<W: Write> {
    out: W,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one event
    pub fn render(&mut self, event: &TranscriptEvent) -> io::Result<()> {
        match event {
            TranscriptEvent::Message(message) => self.render_message(message)?,
            // Selector rejections are logged, never shown.
            TranscriptEvent::SpeakerFallback { .. } => return Ok(()),
            TranscriptEvent::Terminated(reason) => self.render_status(reason)?,
        }
        self.out.flush()
    }

    fn render_message(&mut self, message: &Message) -> io::Result<()> {
        writeln!(self.out, "---------- {} ----------", message.speaker)?;

        for call in &message.tool_calls {
            writeln!(self.out, "[{}] {}", call.name, call.arguments)?;
            match &call.outcome {
                ToolOutcome::Success { .. } => writeln!(self.out, "  -> ok")?,
                ToolOutcome::Error { error } => writeln!(self.out, "  -> {}", error)?,
            }
        }

        writeln!(self.out, "{}", message.content)?;
        Ok(())
    }

    fn render_status(&mut self, reason: &TerminationReason) -> io::Result<()> {
        writeln!(self.out, "==========")?;
        writeln!(self.out, "Run ended: {}", reason)
    }

    /// Drain a stream of events, rendering each as it arrives
    pub async fn drain<S>(&mut self, mut events: S) -> io::Result<()>
    where
        S: Stream<Item = TranscriptEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            self.render(&event)?;
        }
        Ok(())
    }
}
