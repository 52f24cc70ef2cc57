//! Tool catalog

use std::sync::Arc;

use fprime_landscape::Aggregator;
use fprime_types::AuthorizationPolicy;

use crate::proxy::ProxyClient;
use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::ToolError;

pub mod documents;
pub mod landscape;
pub mod proxied;
pub mod status;

pub use documents::DocumentStub;
pub use landscape::LandscapeTool;
pub use proxied::ProxiedTool;
pub use status::{AdminStatsTool, ServerHealthTool};

/// Settings the catalog needs beyond its collaborators
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Policy for every tool without a dedicated one
    pub default_policy: AuthorizationPolicy,
    /// Role required by `admin_stats`
    pub admin_role: String,
    pub service_name: String,
    pub environment: String,
}

/// Register the full catalog
pub fn register_catalog(
    registry: &mut ToolRegistry,
    aggregator: Aggregator,
    proxy: ProxyClient,
    config: &CatalogConfig,
) -> Result<(), ToolError> {
    let policy = &config.default_policy;

    registry.register(ToolDescriptor::new(
        landscape::NAME,
        landscape::DESCRIPTION,
        landscape::input_schema(),
        policy.clone(),
        Arc::new(LandscapeTool::new(aggregator.clone())),
    )?)?;

    for entry in proxied::CATALOG {
        registry.register(ToolDescriptor::new(
            entry.name,
            entry.description,
            (entry.input_schema)(),
            policy.clone(),
            Arc::new(ProxiedTool::new(entry.name, proxy.clone(), entry.flatten_qualifiers)),
        )?)?;
    }

    registry.register(ToolDescriptor::new(
        documents::FILTER_DOCUMENTS,
        "Filter internal documents by prompt and qualifiers",
        documents::filter_schema(),
        policy.clone(),
        Arc::new(DocumentStub::new(
            "No document filter endpoint wired yet",
        )),
    )?)?;
    registry.register(ToolDescriptor::new(
        documents::QUERY_DOCUMENT,
        "Ask a question about one internal document",
        documents::query_schema(),
        policy.clone(),
        Arc::new(DocumentStub::new("No document query endpoint wired yet")),
    )?)?;

    registry.register(ToolDescriptor::new(
        status::SERVER_HEALTH,
        "Service name, environment and liveness",
        crate::schema::no_arguments(),
        AuthorizationPolicy::Public,
        Arc::new(ServerHealthTool::new(
            config.service_name.clone(),
            config.environment.clone(),
        )),
    )?)?;

    // Registered last so its listing covers the whole catalog
    let mut names = registry.names();
    names.push(status::ADMIN_STATS.to_string());
    names.sort();
    registry.register(ToolDescriptor::new(
        status::ADMIN_STATS,
        "Registry and landscape cache statistics",
        crate::schema::no_arguments(),
        AuthorizationPolicy::role(config.admin_role.clone()),
        Arc::new(AdminStatsTool::new(names, aggregator)),
    )?)?;

    tracing::info!(tools = registry.len(), "Tool catalog registered");
    Ok(())
}
