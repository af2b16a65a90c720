pub mod llm_provider;
pub mod pdf;
pub mod persona;
pub mod prompt;
pub mod secrets;
