//! Sakumon-Extract: structured payload recovery and slot filling.
//!
//! Language-model output is text that usually, but not always, contains
//! the JSON we asked for. This crate turns that text back into structured
//! data without ever executing it:
//!
//! - [`payload`] peels JSON out of chat replies (fenced blocks, embedded
//!   objects, a last-resort repair pass).
//! - [`expr`] folds the arithmetic expressions models like to leave in
//!   place of numbers (`Math.PI / 3` and friends) into literals, against
//!   a closed whitelist.
//! - [`numbers`] reads problem counts out of Japanese text, including
//!   kanji and fullwidth digits.
//! - [`slots`] runs the conversational slot-filling loop that collects a
//!   complete [`ProblemSpec`](sakumon_core::ProblemSpec).

pub mod expr;
pub mod numbers;
pub mod payload;
pub mod slots;

pub use payload::{extract_json, StructuredExtractor};
pub use slots::{SlotFillingEngine, SlotFillingOutcome};
