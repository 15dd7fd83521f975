pub mod client;
pub mod topics;
pub mod util;

pub use client::{ChatClient, ChatMessage, ChatRequest};
pub use topics::{Classification, TopicClassifier};
