//! # mailassist-server
//!
//! HTTP front end for the mailassist email assistant.
//!
//! | route | |
//! |-------|-|
//! | `GET /` | liveness message |
//! | `GET /health` | `{"status": "healthy"}` |
//! | `GET /ui` | web form |
//! | `POST /ingest` | re-index the documents directory in the background |
//! | `POST /process-email` | draft a reply to an email |

pub mod config;
pub mod error;
pub mod quota;
pub mod server;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, EmbeddingBackend, EmbeddingSettings};
pub use error::ApiError;
pub use quota::DailyQuota;
pub use server::{AppState, app_router, run_server};
pub use telemetry::init_tracing;
