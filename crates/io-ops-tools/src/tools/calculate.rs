//! `calculate`: restricted arithmetic.

use async_trait::async_trait;
use serde_json::{Value, json};

use io_protocol::Operation;

use crate::calculator;
use crate::error::ToolResult;
use crate::types::{OpsTool, ToolContext, primary_str};

pub struct Calculate;

#[async_trait]
impl OpsTool for Calculate {
    fn operation(&self) -> Operation {
        Operation::Calculate
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression (numbers, + - * / % **, parentheses)"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. (10 + 20 + 30) / 3"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext<'_>) -> ToolResult<String> {
        let expression = primary_str(&args, "expression")?;
        Ok(calculator::evaluate(&expression))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRetriever;
    use io_tickets::MockTicketStore;

    #[tokio::test]
    async fn evaluates_object_and_bare_string() {
        let store = MockTicketStore::in_memory();
        let retriever = MockRetriever::new();
        let ctx = ToolContext::new(&store, &retriever);

        let out = Calculate
            .execute(json!({"expression": "(10 + 20 + 30) / 3"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "20");

        let out = Calculate.execute(json!("2 ** 10"), &ctx).await.unwrap();
        assert_eq!(out, "1024");
    }

    #[tokio::test]
    async fn evaluator_errors_are_responses() {
        let store = MockTicketStore::in_memory();
        let retriever = MockRetriever::new();
        let ctx = ToolContext::new(&store, &retriever);
        let out = Calculate
            .execute(json!({"expression": "open('/etc/passwd')"}), &ctx)
            .await
            .unwrap();
        assert!(out.starts_with(calculator::ERROR_PREFIX));
    }

    #[tokio::test]
    async fn missing_expression_is_an_error() {
        let store = MockTicketStore::in_memory();
        let retriever = MockRetriever::new();
        let ctx = ToolContext::new(&store, &retriever);
        assert!(Calculate.execute(json!({}), &ctx).await.is_err());
    }
}
