//! Tools served by the VC proxy backend

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::proxy::ProxyClient;
use crate::registry::{CallContext, ToolHandler};
use crate::ToolError;

/// Catalog entry for one proxy endpoint
pub struct ProxiedEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: fn() -> Value,
    /// Merge `qualifiers` into the top-level payload before posting
    pub flatten_qualifiers: bool,
}

pub const CATALOG: &[ProxiedEntry] = &[
    ProxiedEntry {
        name: "get_email_address",
        description: "Look up a person's email address from name, company domain or LinkedIn URL",
        input_schema: contact_schema,
        flatten_qualifiers: true,
    },
    ProxiedEntry {
        name: "pull_founder_exec_info",
        description: "Founder and executive information for a company",
        input_schema: prompt_schema,
        flatten_qualifiers: false,
    },
    ProxiedEntry {
        name: "get_similars",
        description: "Companies similar to a name, domain or description",
        input_schema: company_schema,
        flatten_qualifiers: false,
    },
    ProxiedEntry {
        name: "get_similar_people",
        description: "People similar to a natural-language description",
        input_schema: prompt_schema,
        flatten_qualifiers: false,
    },
    ProxiedEntry {
        name: "get_theme_description",
        description: "Description of an investment theme",
        input_schema: prompt_schema,
        flatten_qualifiers: false,
    },
    ProxiedEntry {
        name: "map_theme",
        description: "Map companies onto an investment theme",
        input_schema: prompt_schema,
        flatten_qualifiers: false,
    },
];

fn contact_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "domain": {"type": "string"},
            "linkedin_url": {"type": "string"},
            "qualifiers": {"type": "object"}
        },
        "anyOf": [
            {"required": ["name"]},
            {"required": ["domain"]},
            {"required": ["linkedin_url"]}
        ]
    })
}

fn company_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "prompt": {"type": "string"},
            "name": {"type": "string"},
            "domain": {"type": "string"},
            "linkedin_url": {"type": "string"},
            "qualifiers": {"type": "object"}
        }
    })
}

fn prompt_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "prompt": {"type": "string"},
            "qualifiers": {"type": "object"}
        }
    })
}

/// Forwards its arguments to one proxy endpoint
pub struct ProxiedTool {
    endpoint: &'static str,
    client: ProxyClient,
    flatten_qualifiers: bool,
}

impl ProxiedTool {
    pub fn new(endpoint: &'static str, client: ProxyClient, flatten_qualifiers: bool) -> Self {
        Self {
            endpoint,
            client,
            flatten_qualifiers,
        }
    }
}

/// `{qualifiers: {..}, rest..}` becomes `{..qualifiers, rest..}`; explicit
/// fields win over qualifier keys of the same name
pub fn flatten_qualifiers(arguments: Value) -> Value {
    let Value::Object(mut fields) = arguments else {
        return arguments;
    };
    let mut payload = match fields.remove("qualifiers") {
        Some(Value::Object(q)) => q,
        _ => Map::new(),
    };
    payload.extend(fields.into_iter().filter(|(_, v)| !v.is_null()));
    Value::Object(payload)
}

#[async_trait]
impl ToolHandler for ProxiedTool {
    async fn call(&self, ctx: &CallContext, arguments: Value) -> Result<Value, ToolError> {
        let payload = if self.flatten_qualifiers {
            flatten_qualifiers(arguments)
        } else {
            arguments
        };
        Ok(self.client.post(self.endpoint, &payload, ctx.bearer()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_qualifiers() {
        let out = flatten_qualifiers(json!({
            "name": "Ada Lovelace",
            "domain": null,
            "qualifiers": {"title": "CTO", "name": "ignored"}
        }));
        assert_eq!(out, json!({"title": "CTO", "name": "Ada Lovelace"}));
    }

    #[test]
    fn test_catalog_names_unique() {
        let mut names: Vec<_> = CATALOG.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }
}
