//! Weather tool - one-line current conditions from wttr.in

use super::{parse_input, Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};

const WTTR_URL: &str = "https://wttr.in";

pub struct WeatherTool {
    base_url: String,
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self {
            base_url: WTTR_URL.to_string(),
        }
    }
}

impl WeatherTool {
    /// The city is a single escaped path segment
    fn url_for(&self, city: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| format!("Invalid weather URL: {e}"))?;
        url.path_segments_mut()
            .map_err(|()| "Weather URL cannot take a path".to_string())?
            .pop_if_empty()
            .push(city);
        url.set_query(Some("format=3"));
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct WeatherInput {
    city: String,
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn description(&self) -> String {
        "Gets the current weather for a city".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["city"],
            "properties": {
                "city": {"type": "string", "description": "City name"}
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input: WeatherInput = match parse_input(input) {
            Ok(i) => i,
            Err(e) => return e,
        };

        let url = match self.url_for(&input.city) {
            Ok(url) => url,
            Err(e) => return ToolOutput::error(e),
        };

        let response = match ctx.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ToolOutput::error(format!("Weather request failed: {e}")),
        };

        let status = response.status();
        match response.text().await {
            Ok(body) if status.is_success() => ToolOutput::success(body.trim_end().to_string()),
            Ok(body) => ToolOutput::error(format!("Weather service returned {status}: {body}")),
            Err(e) => ToolOutput::error(format!("Failed to read weather response: {e}")),
        }
    }
}
