//! Streaming response layer for knowledge-base chat.
//!
//! Bytes from the transport flow through [`sse::LineFramer`], each data line
//! through [`extract`], [`thinking::TagSplitter`] and [`completion`], and come
//! out of [`orchestrator::Orchestrator`] as [`StreamEvent`]s. Failures are
//! mapped by [`classify`] into [`kbchat_core::ChatError`].

pub mod classify;
pub mod client;
pub mod completion;
pub mod extract;
pub mod observer;
pub mod orchestrator;
pub mod sse;
pub mod stream;
pub mod thinking;
pub mod transcript;

pub use client::{ChatClient, RequestDescriptor};
pub use observer::{DropReason, NoopObserver, StreamObserver};
pub use orchestrator::Orchestrator;
pub use stream::{Segment, StreamEvent, Termination};
pub use thinking::{SplitterState, TagSplitter};
pub use transcript::Transcript;
