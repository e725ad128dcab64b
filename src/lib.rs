//! GameStore bridge - correlates synchronous gateway requests with
//! asynchronous agent conversations
//!
//! A caller submits a [`GatewayRequest`] and gets a handle back. The gateway
//! agent forwards the request over the [`MessageBus`] to a provider agent,
//! tagged with a fresh correlation id, and resolves the handle when the reply
//! carrying that id comes back. Listing both sources fans out to two
//! providers and joins their answers before resolving.

pub mod agent;
pub mod bus;
pub mod catalog;
pub mod config;
pub mod correlation;
pub mod error;
pub mod gateway;
pub mod providers;
pub mod service;
pub mod utils;

pub use agent::{Agent, Behavior, Scheduler, SchedulerHandle};
pub use bus::{AgentRef, Message, MessageBus, MessageTemplate, Performative, NOT_FOUND};
pub use catalog::{Game, GameCatalog, MemoryCatalog};
pub use config::Config;
pub use correlation::{CorrelationId, CorrelationStore, InMemoryCorrelationStore, Reply, ResultHandle};
pub use error::{BridgeError, Result};
pub use gateway::{GatewayHandle, GatewayRequest, Source};
pub use service::{
    CombinedGameListResponse, GameListResponse, GameService, GameStoreRuntime, SearchOutcome,
    SearchResponse,
};
