pub mod email;
pub mod generation;
pub mod merge;
pub mod parser;
pub mod prompts;
pub mod refresh;
pub mod retry;

pub use generation::{GeminiClient, GenerationService};
pub use refresh::{RefreshController, RefreshOutcome, SkipReason, ToggleOutcome};
pub use retry::GenerationClient;
