//! Provider Backend Abstraction
//!
//! The [`ModelAdapter`](traits::ModelAdapter) capability contract plus the
//! concrete provider adapters. The routing core only ever talks to the
//! trait; everything provider-specific (wire bodies, auth, response
//! parsing) stays behind it.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod traits;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use traits::{AdapterError, ModelAdapter, ModelResponse, ProviderConfig};
