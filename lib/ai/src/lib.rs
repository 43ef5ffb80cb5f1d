//! Model gateway for the deferral engine.
//!
//! The engine talks to a language model only through [`ModelGateway`]:
//! given the conversation history and the declared functions, the model
//! either answers or asks for function calls. Provider wire formats live
//! behind implementations of this trait.

pub mod error;
pub mod gateway;
pub mod scripted;

pub use error::ModelGatewayError;
pub use gateway::{GenerateRequest, ModelGateway, ModelReply};
pub use scripted::ScriptedGateway;
