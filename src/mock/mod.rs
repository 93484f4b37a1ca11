//! A lightweight HTTP server that mimics the Ollama generation API. It
//! answers `/api/tags` and `/api/generate` (plain JSON or ndjson streaming)
//! with permissive CORS headers, so browser extensions can be exercised
//! without a real model behind them.

pub mod http;
pub mod routes;
mod server;

pub use server::*;
