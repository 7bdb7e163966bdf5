pub mod client;
pub mod config;
pub mod domains;
pub mod error;
pub mod factories;
pub mod interfaces;
pub mod providers;
pub mod services;
pub mod stores;

pub use crate::client::ArborBot;
pub use crate::config::Config;
pub use crate::domains::answer::{
    Answer, AnswerEnvelope, AnswerRequest, AnswerSource, ChunkHit,
};
pub use crate::error::{ArborBotError, Result};
