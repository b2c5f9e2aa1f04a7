//! Current time tool.

use crate::clock::Clock;
use async_trait::async_trait;
use casa_core::error::ToolError;
use casa_core::tool::{Tool, ToolResult};
use chrono::NaiveDateTime;
use std::sync::Arc;

/// e.g. "Monday, 5. October 2026. It is currently 03:07PM."
const TIME_FORMAT: &str = "%A, %-d. %B %Y. It is currently %I:%M%p.";

pub struct CurrentTimeTool {
    clock: Arc<dyn Clock>,
}

impl CurrentTimeTool {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

pub fn format_time(now: NaiveDateTime) -> String {
    now.format(TIME_FORMAT).to_string()
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(format_time(self.clock.now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn afternoon_uses_twelve_hour_clock() {
        let tool = CurrentTimeTool::new(Arc::new(FixedClock(at(15, 7))));
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(result.output, "Monday, 5. October 2026. It is currently 03:07PM.");
    }

    #[test]
    fn morning_is_am() {
        assert_eq!(
            format_time(at(9, 30)),
            "Monday, 5. October 2026. It is currently 09:30AM."
        );
    }

    #[test]
    fn midnight_is_twelve_am() {
        assert!(format_time(at(0, 0)).ends_with("12:00AM."));
    }

    #[tokio::test]
    async fn ignores_arguments() {
        let tool = CurrentTimeTool::new(Arc::new(FixedClock(at(12, 0))));
        let result = tool
            .execute(serde_json::json!({"unexpected": true}))
            .await
            .unwrap();
        assert!(result.output.ends_with("12:00PM."));
    }
}
