pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod prompts;
pub mod script;
pub mod translate;
pub mod workflow;
