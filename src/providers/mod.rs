//! Provider agents
//!
//! A provider wraps one [`GameCatalog`] and answers two kinds of REQUEST:
//!
//! - its list sentinel (e.g. `LIST_ALL_PRIMARY`): replies with the JSON array of
//!   every record
//! - anything else: treated as a title; replies with one JSON record, or
//!   `NOT_FOUND`
//!
//! A provider built with a peer does not answer a title miss itself. It opens
//! an [`AskPeer`] sub-conversation and forwards whatever the peer says.
//!
//! Catalog failures never cross the message boundary: a failed search is a
//! miss and a failed listing is answered with `NOT_FOUND`.

pub mod fallback;

pub use fallback::{peer_request_id, AskPeer, PEER_ID_PREFIX};

use std::sync::Arc;

use tracing::{debug, info};

use crate::agent::{Agent, AgentContext, Behavior};
use crate::bus::{AgentRef, Message, MessageBus, MessageTemplate, Performative, NOT_FOUND};
use crate::catalog::GameCatalog;
use crate::error::Result;
use crate::log_component;

/// Builder for a provider agent.
pub struct ProviderBuilder {
    name: AgentRef,
    catalog: Arc<dyn GameCatalog>,
    list_sentinel: String,
    peer: Option<AgentRef>,
}

impl ProviderBuilder {
    pub fn new(
        name: impl Into<AgentRef>,
        catalog: Arc<dyn GameCatalog>,
        list_sentinel: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            catalog,
            list_sentinel: list_sentinel.into(),
            peer: None,
        }
    }

    /// Ask `peer` when a title is not found locally.
    pub fn with_peer(mut self, peer: impl Into<AgentRef>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Registers the agent on `bus` with its search and list servers.
    ///
    /// # Errors
    /// `BridgeError::Config` if the name is taken.
    pub fn build(self, bus: &MessageBus) -> Result<Agent> {
        let Self {
            name,
            catalog,
            list_sentinel,
            peer,
        } = self;

        let is_request = MessageTemplate::performative(Performative::Request);
        let list_template = is_request
            .clone()
            .and(MessageTemplate::content(list_sentinel.as_str()));
        let search_template = is_request.and(MessageTemplate::not(MessageTemplate::content(
            list_sentinel.as_str(),
        )));

        info!(
            component = "provider",
            agent = %name,
            source = %catalog.source_label(),
            peer = peer.as_ref().map(AgentRef::name).unwrap_or("none"),
            "Provider agent built"
        );

        let search_catalog = Arc::clone(&catalog);
        let agent = Agent::new(name, bus)?
            .with_behavior(Behavior::cyclic(
                "search-server",
                search_template,
                move |ctx, msg| {
                    serve_search(ctx, search_catalog.as_ref(), peer.as_ref(), msg);
                    Ok(())
                },
            ))
            .with_behavior(Behavior::cyclic(
                "list-server",
                list_template,
                move |ctx, msg| {
                    serve_list(ctx, catalog.as_ref(), msg);
                    Ok(())
                },
            ));
        Ok(agent)
    }
}

fn serve_search(
    ctx: &mut AgentContext<'_>,
    catalog: &dyn GameCatalog,
    peer: Option<&AgentRef>,
    request: Message,
) {
    let found = match catalog.find_by_title(&request.content) {
        Ok(Some(game)) => match serde_json::to_string(&game) {
            Ok(json) => Some(json),
            Err(e) => {
                let reason = e.to_string();
                log_component!(warn, "provider", "Cannot encode record", error = reason.as_str());
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            let reason = e.to_string();
            log_component!(
                warn,
                "provider",
                "Catalog search failed, treating as miss",
                agent = ctx.name().name(),
                error = reason.as_str(),
            );
            None
        }
    };

    match (found, peer) {
        (Some(json), _) => {
            debug!(component = "provider", agent = %ctx.name(), title = %request.content, "Found locally");
            reply(ctx, &request, json);
        }
        (None, Some(peer)) => {
            ctx.add_behavior(Behavior::multi_step(
                "ask-peer",
                AskPeer::new(request, peer.clone()),
            ));
        }
        (None, None) => {
            debug!(component = "provider", agent = %ctx.name(), title = %request.content, "Not found");
            reply(ctx, &request, NOT_FOUND.to_string());
        }
    }
}

fn serve_list(ctx: &mut AgentContext<'_>, catalog: &dyn GameCatalog, request: Message) {
    let content = catalog
        .list_all()
        .and_then(|games| serde_json::to_string(&games).map_err(Into::into));
    let content = match content {
        Ok(json) => json,
        Err(e) => {
            let reason = e.to_string();
            log_component!(
                warn,
                "provider",
                "Catalog listing failed",
                agent = ctx.name().name(),
                error = reason.as_str(),
            );
            NOT_FOUND.to_string()
        }
    };
    reply(ctx, &request, content);
}

fn reply(ctx: &mut AgentContext<'_>, request: &Message, content: String) {
    let msg = request
        .create_reply(ctx.name().clone(), Performative::Inform)
        .with_content(content);
    ctx.send(msg);
}
