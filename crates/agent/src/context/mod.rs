//! Bounded conversational context.
//!
//! Every completion call sees the same shape of input: up to N prior lines of
//! the channel, oldest first, ending with the message being handled. Built
//! fresh per call and never cached.

pub mod assembler;

pub use assembler::{
    ContextAssembler, DEFAULT_TRUNCATE_LENGTH, TRUNCATION_MARKER, Transcript, TranscriptLine,
    truncate_text,
};
