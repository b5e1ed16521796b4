//! Voxmail client core.
//!
//! The pieces a Voxmail front end needs beneath its views: a persisted
//! session store, an HTTP wrapper for the Voxmail API, a query cache with
//! staleness windows and request de-duplication, per-resource read and
//! mutation hooks, and the hydration gate that holds authenticated views
//! back until the session is restored.
//!
//! ```no_run
//! use voxmail_client::{AppContext, ClientConfig, MessageFilters};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = AppContext::from_config(ClientConfig::load()?)?;
//! ctx.hydration_gate().mount();
//!
//! let inbox = ctx.voice_messages().list(MessageFilters::default());
//! let state = inbox.fetch().await;
//! if let Some(page) = state.data {
//!     println!("{} messages", page.total);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod hydration;
pub mod notify;
pub mod query;
pub mod resources;
pub mod result_ext;
pub mod session;
pub mod storage;

pub use api::{AiApi, AuthApi, BillingApi, CheckoutRedirect, Credentials, Registration};
pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{ApiFailure, ApiResult, ClientError, ClientResult, FailureKind};
pub use http::{ApiClient, RequestOptions};
pub use hydration::{GateState, HydrationGate};
pub use notify::{ChannelNotifier, Notification, NotificationKind, Notifier, TracingNotifier};
pub use query::{Mutator, Query, QueryCache, QueryKey, QueryState, QueryStatus};
pub use resources::{MessageFilters, MessageStatus, Page, TimeRange};
pub use session::{Session, SessionStore, User, UserPatch};
pub use storage::{FileStore, KeyValueStore, MemoryStore, UnavailableStore};
