//! `retrieve_incident_info`: runbook and incident reference lookup.

use async_trait::async_trait;
use serde_json::{Value, json};

use io_protocol::Operation;

use crate::error::ToolResult;
use crate::types::{OpsTool, ToolContext, primary_str};

pub struct RetrieveIncidentInfo;

#[async_trait]
impl OpsTool for RetrieveIncidentInfo {
    fn operation(&self) -> Operation {
        Operation::RetrieveIncidentInfo
    }

    fn description(&self) -> &str {
        "Search runbooks and past incident reports; output ends with a [SOURCES] line"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look up, e.g. web CPU spike runbook"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext<'_>) -> ToolResult<String> {
        let query = primary_str(&args, "query")?;
        let retrieval = ctx.retriever.search(&query, ctx.top_k).await?;
        Ok(retrieval.render())
    }
}
