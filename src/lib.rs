//! # AiTa
//!
//! A classroom question-answering gateway. Student questions pass through a
//! policy gate before a locally hosted language model answers them from the
//! teacher's own documents; anything the gate will not answer gets a fixed
//! fallback reply and lands in a per-teacher log for review.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │  HTTP    │──▶│          AnswerGate          │──▶│  Ollama  │
//! │ /ask     │   │ mode → policy → context →    │   │ generate │
//! │ /unknowns│   │ model → sentence truncation  │   └──────────┘
//! └──────────┘   └──────┬───────────────┬───────┘
//!                       ▼               ▼
//!                ┌──────────┐    ┌───────────┐
//!                │  Corpus  │    │ Audit log │
//!                │  docs/   │    │ CSV per   │
//!                │          │    │ teacher   │
//!                └──────────┘    └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! aita check                                  # validate config + policy
//! aita corpus                                 # list loaded documents
//! aita ask "when is the lathe quiz?"          # one question from the CLI
//! aita serve                                  # start the HTTP server
//! aita unknowns --teacher engineering         # review deflected questions
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Request, answer, and audit types |
//! | [`policy`] | Policy file loading and blocklist |
//! | [`corpus`] | Teacher document loader |
//! | [`retrieve`] | Context retrieval trait and naive retriever |
//! | [`generate`] | Text generation trait and Ollama client |
//! | [`text`] | Sentence truncation |
//! | [`audit`] | Per-teacher deflection log |
//! | [`gate`] | The answer gate |
//! | [`server`] | HTTP server |
//! | [`logging`] | Tracing subscriber setup |

pub mod audit;
pub mod config;
pub mod corpus;
pub mod gate;
pub mod generate;
pub mod logging;
pub mod models;
pub mod policy;
pub mod retrieve;
pub mod server;
pub mod text;
