//! Gemini File Search REST client: stores, uploads, operations and grounded generation.

pub mod client;
pub mod grounding;
pub mod operation;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
