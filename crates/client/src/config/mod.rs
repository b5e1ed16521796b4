pub use client_config::{ApiConfig, CacheConfig, ClientConfig, PaymentsConfig, StorageConfig};

mod client_config;
