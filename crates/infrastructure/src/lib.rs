//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod file_key_value_store;
mod http_api_client;
mod in_memory_key_value_store;
mod single_flight;
mod tracing_notifier;

pub use file_key_value_store::FileKeyValueStore;
pub use http_api_client::{HttpApiClient, HttpApiClientConfig};
pub use in_memory_key_value_store::InMemoryKeyValueStore;
pub use single_flight::{Flight, FlightGuard, FlightWaiter, SingleFlight};
pub use tracing_notifier::TracingNotifier;
