use crate::embeddings::Embedder;
use crate::error::{RagError, Result};
use crate::llm::ChatModel;
use crate::rag::RagSystem;
use log::{error, info, warn};
use std::io::{BufRead, Write};

/// One answered query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub query: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for input
    Idle,
    /// A query has been submitted and its answer is pending
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Submit,
    Succeeded,
    Failed,
}

impl SessionState {
    /// Transition table; events that do not apply leave the state unchanged
    pub fn on(self, event: SessionEvent) -> SessionState {
        match (self, event) {
            (SessionState::Idle, SessionEvent::Submit) => SessionState::Processing,
            (SessionState::Processing, SessionEvent::Succeeded)
            | (SessionState::Processing, SessionEvent::Failed) => SessionState::Idle,
            (state, event) => {
                warn!("Ignoring {:?} while {:?}", event, state);
                state
            }
        }
    }
}

/// Conversation state for one interactive session.
///
/// History is append-only and kept in submission order.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    history: Vec<ConversationTurn>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            state: SessionState::Idle,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Run one query through the pipeline.
    ///
    /// On success the turn is appended; on failure history is left as it was.
    /// Either way the session ends up `Idle`.
    pub async fn submit<E, L>(
        &mut self,
        system: &RagSystem<E, L>,
        query: &str,
    ) -> Result<&ConversationTurn>
    where
        E: Embedder,
        L: ChatModel,
    {
        if self.state != SessionState::Idle {
            return Err(RagError::SessionBusy);
        }
        let guard = ProcessingGuard::enter(&mut self.state);

        match system.answer(query).await {
            Ok(answer) => {
                guard.finish(SessionEvent::Succeeded);
                self.history.push(ConversationTurn {
                    query: query.to_string(),
                    answer: answer.text,
                });
                let turn = &self.history[self.history.len() - 1];
                Ok(turn)
            }
            Err(e) => {
                guard.finish(SessionEvent::Failed);
                Err(e)
            }
        }
    }
}

/// Holds the session in `Processing`; dropping it unfinished counts as a failure
/// so a cancelled query cannot leave the session busy.
struct ProcessingGuard<'a> {
    state: &'a mut SessionState,
}

impl<'a> ProcessingGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        *state = state.on(SessionEvent::Submit);
        ProcessingGuard { state }
    }

    fn finish(self, event: SessionEvent) {
        *self.state = self.state.on(event);
        std::mem::forget(self);
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        warn!("Query abandoned before completion");
        *self.state = self.state.on(SessionEvent::Failed);
    }
}

/// Shown while the transcript is empty
pub fn render_welcome<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "ACME NEXUS | Corporate Intelligence & Search Platform")?;
    writeln!(out)?;
    writeln!(out, "Begin your search by typing below.")?;
    writeln!(
        out,
        "Try: \"What are our sustainability goals?\" or \"List the engineering team.\""
    )?;
    writeln!(out, "Type 'exit' to quit.")
}

/// Render a single turn; `number` is 1-based
pub fn render_turn<W: Write>(
    out: &mut W,
    number: usize,
    turn: &ConversationTurn,
) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "QUERY LOG #{}", number)?;
    writeln!(out, "> {}", turn.query)?;
    writeln!(out)?;
    writeln!(out, "{}", turn.answer.trim_end())
}

/// Render the whole transcript in submission order
pub fn render_transcript<W: Write>(
    out: &mut W,
    history: &[ConversationTurn],
) -> std::io::Result<()> {
    if history.is_empty() {
        return render_welcome(out);
    }
    for (i, turn) in history.iter().enumerate() {
        render_turn(out, i + 1, turn)?;
    }
    Ok(())
}

/// Read queries line by line until `exit` or end of input.
///
/// Each query runs to completion before the next line is read. Query
/// failures are printed and the loop continues.
pub async fn run_query_loop<E, L, R, W>(
    system: &RagSystem<E, L>,
    session: &mut Session,
    mut input: R,
    mut output: W,
) -> Result<()>
where
    E: Embedder,
    L: ChatModel,
    R: BufRead,
    W: Write,
{
    render_transcript(&mut output, session.history())?;

    let mut buffer = String::new();
    loop {
        write!(output, "\nAccess Nexus Database... ")?;
        output.flush()?;

        buffer.clear();
        if input.read_line(&mut buffer)? == 0 {
            info!("End of input");
            break;
        }

        let query = buffer.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") {
            info!("Goodbye!");
            break;
        }

        writeln!(output, "Analyzing Corporate Data...")?;
        output.flush()?;

        match session.submit(system, query).await {
            Ok(turn) => {
                let turn = turn.clone();
                writeln!(output, "Analysis Complete")?;
                render_turn(&mut output, session.history().len(), &turn)?;
            }
            Err(e) => {
                error!("Query failed: {}", e);
                writeln!(output, "Processing Error: {}", e)?;
            }
        }
    }

    Ok(())
}
