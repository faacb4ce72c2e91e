//! Simulated AI feedback: template selection, history, and reveal.

pub mod history;
pub mod stream;
pub mod templates;

pub use history::{AIMessage, FeedbackHistory, IdGenerator, SequentialIds, UuidIds};
pub use stream::{CancelToken, RevealStream};
pub use templates::{
    Feedback, FeedbackSelector, FeedbackTemplate, DEFAULT_FAILURE_KEY, DEFAULT_SUCCESS_KEY,
};
