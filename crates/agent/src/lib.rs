//! The research agent loop.
//!
//! A run follows a **Dispatch → Execute tools → Dispatch** cycle:
//!
//! 1. **Build** the transcript (system prompt, earlier turns, the question)
//! 2. **Dispatch** it to the model together with the tool catalog
//! 3. **If tool calls**: run each one, stream progress, append the results, go to 2
//! 4. **If text**: stream it to the client and finish
//!
//! The cycle stops at the iteration budget, in which case a fallback answer is
//! built from what the run has seen so far.

pub mod fallback;
pub mod loop_runner;
pub mod prompt;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use loop_runner::{AgentSettings, ResearchAgent, RunInput, RunOutcome};
pub use stream_event::{AgentEvent, ToolCallRecord};
