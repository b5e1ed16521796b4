//! Typed wrappers for the non-cached API endpoints.

pub mod ai;
pub mod auth;
pub mod billing;

pub use ai::{AiApi, ChatMessage, ChatRequest, ChatResponse, ChatRole, ProcessTextRequest, ProcessTextResponse};
pub use auth::{AuthApi, AuthResponse, Credentials, Registration};
pub use billing::{BillingApi, CheckoutRedirect, SubscriptionState, SubscriptionStatus};
