//! Runtime assembly: bus, correlation store, agents and scheduler.

use std::sync::Arc;

use tracing::info;

use super::{GameService, ServiceSettings};
use crate::agent::{Scheduler, SchedulerHandle};
use crate::bus::{AgentRef, MessageBus};
use crate::catalog::{GameCatalog, MemoryCatalog, PRIMARY_SOURCE_LABEL, SECONDARY_SOURCE_LABEL};
use crate::config::{expand_home, Config};
use crate::correlation::{CorrelationStore, InMemoryCorrelationStore};
use crate::error::Result;
use crate::gateway::{self, GatewayHandle, GatewayRoutes, GatewaySettings};
use crate::gateway::{LIST_ALL_PRIMARY, LIST_ALL_SECONDARY};
use crate::providers::ProviderBuilder;

/// A running gateway with its two providers.
pub struct GameStoreRuntime {
    scheduler: SchedulerHandle,
    gateway: GatewayHandle,
    service: GameService,
}

impl GameStoreRuntime {
    /// Builds everything from `config` and starts the agents.
    ///
    /// Catalog files named in `config.catalogs` are loaded; unset paths fall
    /// back to the built-in seed catalogs. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    /// `BridgeError::Config` for invalid settings, `BridgeError::Catalog` for
    /// unreadable catalog files.
    ///
    /// # Example
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// use gamestore_bridge::{Config, GameStoreRuntime, SearchOutcome};
    ///
    /// let runtime = GameStoreRuntime::start(&Config::default()).unwrap();
    /// let outcome = runtime.service().search("Elden Ring").await.unwrap();
    /// assert!(matches!(outcome, SearchOutcome::Found(_)));
    /// runtime.shutdown().await;
    /// # });
    /// ```
    pub fn start(config: &Config) -> Result<Self> {
        let primary = load_catalog(
            PRIMARY_SOURCE_LABEL,
            config.catalogs.primary_path.as_deref(),
            MemoryCatalog::primary_seed,
        )?;
        let secondary = load_catalog(
            SECONDARY_SOURCE_LABEL,
            config.catalogs.secondary_path.as_deref(),
            MemoryCatalog::secondary_seed,
        )?;
        Self::start_with(
            config,
            primary,
            secondary,
            Arc::new(InMemoryCorrelationStore::new()),
        )
    }

    /// Like [`start`](Self::start), with caller-supplied catalogs and store.
    pub fn start_with(
        config: &Config,
        primary: Arc<dyn GameCatalog>,
        secondary: Arc<dyn GameCatalog>,
        store: Arc<dyn CorrelationStore>,
    ) -> Result<Self> {
        config.validate()?;

        let agents = &config.agents;
        let bus = MessageBus::new();
        let mut scheduler = Scheduler::with_idle_wait(config.gateway.idle_wait());

        let mut settings = ServiceSettings::from_config(config);
        settings.primary.label = primary.source_label();
        settings.secondary.label = secondary.source_label();

        let mut primary_provider =
            ProviderBuilder::new(agents.primary.as_str(), primary, LIST_ALL_PRIMARY);
        if agents.fallback_enabled {
            primary_provider = primary_provider.with_peer(agents.secondary.as_str());
        }
        scheduler.register(primary_provider.build(&bus)?);
        scheduler.register(
            ProviderBuilder::new(agents.secondary.as_str(), secondary, LIST_ALL_SECONDARY)
                .build(&bus)?,
        );

        let routes = GatewayRoutes {
            primary: AgentRef::new(agents.primary.as_str()),
            secondary: AgentRef::new(agents.secondary.as_str()),
        };
        let (gateway_agent, gateway) = gateway::build(
            agents.gateway.as_str(),
            &bus,
            store,
            routes,
            &GatewaySettings::from(&config.gateway),
        )?;
        scheduler.register(gateway_agent);

        let scheduler = scheduler.run();
        info!(
            agents = bus.agent_count(),
            fallback = agents.fallback_enabled,
            "GameStore runtime started"
        );

        let service = GameService::new(gateway.clone(), settings);
        Ok(Self {
            scheduler,
            gateway,
            service,
        })
    }

    /// Typed request/response facade.
    pub fn service(&self) -> &GameService {
        &self.service
    }

    /// Raw submission handle.
    pub fn handle(&self) -> &GatewayHandle {
        &self.gateway
    }

    pub fn agent_names(&self) -> Vec<AgentRef> {
        self.scheduler.agent_names()
    }

    /// Stops every agent.
    ///
    /// Later submissions through cloned services or handles fail with
    /// `GatewayClosed`; callers already waiting run into their deadline.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
        info!("GameStore runtime stopped");
    }
}

fn load_catalog(
    label: &str,
    path: Option<&str>,
    seed: fn() -> MemoryCatalog,
) -> Result<Arc<dyn GameCatalog>> {
    let catalog = match path {
        Some(path) => MemoryCatalog::from_json_file(label, &expand_home(path))?,
        None => seed(),
    };
    Ok(Arc::new(catalog))
}
