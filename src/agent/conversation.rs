//! Bounded conversation state machine.
//!
//! Coordinates the three logical roles of the pipeline (the driver that
//! issues a task, the ingestion role and the query role) as an append-only
//! transcript of turns. Termination is a typed signal on each turn, and a
//! round cap guarantees the loop can never spin forever. Once terminated,
//! the transcript is immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

/// Logical participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Issues the task and receives the outcome.
    Driver,
    /// Chunks, embeds and indexes documents.
    Ingestion,
    /// Retrieves passages and synthesizes answers.
    Query,
}

/// Whether a turn ends the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    Continue,
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Running,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    /// A turn carried the terminate signal.
    Signal,
    /// The round cap was reached without a terminate signal.
    RoundCap,
}

/// One turn in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: Role,
    pub content: String,
    pub round: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
    round: usize,
    phase: Phase,
    cause: Option<TerminationCause>,
    round_cap: usize,
}

impl Conversation {
    pub fn new(round_cap: usize) -> Result<Self, PipelineError> {
        if round_cap == 0 {
            return Err(PipelineError::InvalidConfig(
                "round cap must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            messages: Vec::new(),
            round: 0,
            phase: Phase::Idle,
            cause: None,
            round_cap,
        })
    }

    /// Accept a task: `Idle -> Running`.
    pub fn begin(&mut self) -> Result<(), PipelineError> {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Running;
                Ok(())
            }
            Phase::Running => Err(PipelineError::InvalidArgument(
                "conversation is already running".to_string(),
            )),
            Phase::Terminated => Err(PipelineError::ConversationTerminated),
        }
    }

    /// Append one turn and advance the round counter.
    ///
    /// A `Terminate` signal moves the conversation to its terminal state.
    /// Reaching the round cap without one also terminates, and the call
    /// reports `RoundCapExceeded` so callers notice the forced stop. The
    /// capped turn itself is still recorded.
    pub fn append(
        &mut self,
        sender: Role,
        content: impl Into<String>,
        signal: TurnSignal,
    ) -> Result<Phase, PipelineError> {
        match self.phase {
            Phase::Idle => {
                return Err(PipelineError::InvalidArgument(
                    "conversation has not been started".to_string(),
                ))
            }
            Phase::Terminated => return Err(PipelineError::ConversationTerminated),
            Phase::Running => {}
        }

        self.round += 1;
        self.messages.push(ConversationMessage {
            sender,
            content: content.into(),
            round: self.round,
            timestamp: Utc::now(),
        });

        match signal {
            TurnSignal::Terminate => {
                self.phase = Phase::Terminated;
                self.cause = Some(TerminationCause::Signal);
                Ok(Phase::Terminated)
            }
            TurnSignal::Continue if self.round >= self.round_cap => {
                self.phase = Phase::Terminated;
                self.cause = Some(TerminationCause::RoundCap);
                Err(PipelineError::RoundCapExceeded(self.round_cap))
            }
            TurnSignal::Continue => Ok(Phase::Running),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn round_cap(&self) -> usize {
        self.round_cap
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    pub fn termination_cause(&self) -> Option<TerminationCause> {
        self.cause
    }

    pub fn transcript(&self) -> &[ConversationMessage] {
        &self.messages
    }
}
