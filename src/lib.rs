//! Web-search RAG answer service.
//!
//! Answers queries from stored documents when they match, otherwise searches
//! the web, crawls the results, stores them and answers from those.

pub mod core;
pub mod crawler;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;

#[cfg(test)]
mod test_support;
