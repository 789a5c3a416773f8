//! Dispute Server - HTTP intake for payment-provider chargeback webhooks
//!
//! Receives dispute webhooks from Stripe, PayPal, Adyen and any other
//! provider with a mapping on disk, runs them through the normalizer
//! pipeline and answers with the normalized record or the reason it was
//! refused.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe (at least one provider loaded)
//! - `GET /metrics` - Prometheus metrics
//! - `GET /api/v1/providers` - Registered provider keys
//! - `POST /webhooks/{provider}` - Normalize a webhook for a named provider
//! - `POST /webhooks` - Normalize a webhook, detecting the provider
//!
//! # Configuration
//!
//! Read from an optional `normalizer.{toml,yaml,json}` file and
//! `NORMALIZER__*` environment variables, e.g. `NORMALIZER__PORT=9000` or
//! `NORMALIZER__PIPELINE__MAPPINGS_DIR=/etc/normalizer/mappings`.

pub mod config;
pub mod detect;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use detect::detect_provider;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
