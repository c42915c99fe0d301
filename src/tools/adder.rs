//! Adder tool - sums two numbers

use super::{parse_input, Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

pub struct AdderTool;

#[derive(Debug, Deserialize)]
struct AdderInput {
    a: f64,
    b: f64,
}

#[async_trait]
impl Tool for AdderTool {
    fn name(&self) -> &'static str {
        "adder"
    }

    fn description(&self) -> String {
        "Adds two numbers".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "a": {"type": "number"},
                "b": {"type": "number"}
            }
        })
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> ToolOutput {
        match parse_input::<AdderInput>(input) {
            Ok(AdderInput { a, b }) => {
                ToolOutput::success(format!("The sum of {a} and {b} is {}", a + b))
            }
            Err(e) => e,
        }
    }
}
