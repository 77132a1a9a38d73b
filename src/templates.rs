use handlebars::Handlebars;
use log::info;
use serde_json::json;
use std::path::Path;

use crate::error::{Error, Result};
use crate::stats::Insights;

pub const HOME: &str = "home";
pub const INSIGHTS: &str = "insights";

/// Handlebars registry for the two HTML pages
///
/// Built-in templates are compiled in. A template directory, when given,
/// may override either of them with a file of the same name (`home.hbs`,
/// `insights.hbs`).
pub struct Pages {
    registry: Handlebars<'static>,
}

impl Pages {
    /// Register the built-in templates, then any overrides found in `dir`
    ///
    /// # Errors
    /// * `Error::Template` if a template fails to parse or the directory cannot be read
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        let mut registry = Handlebars::new();

        registry
            .register_template_string(HOME, include_str!("./static/home.hbs"))
            .map_err(|e| Error::Template(e.to_string()))?;
        registry
            .register_template_string(INSIGHTS, include_str!("./static/insights.hbs"))
            .map_err(|e| Error::Template(e.to_string()))?;

        if let Some(dir) = dir {
            registry
                .register_templates_directory(".hbs", dir)
                .map_err(|e| Error::Template(e.to_string()))?;
            info!("Loaded page templates from {}", dir.display());
        }

        Ok(Self { registry })
    }

    pub fn render_home(&self) -> Result<String> {
        self.render(HOME, &json!({ "title": "ThinkFast" }))
    }

    /// Render the insights page from the same summary the JSON endpoint serves
    pub fn render_insights(&self, insights: &Insights) -> Result<String> {
        let top = insights
            .top_misspellings
            .first()
            .map(|(_, count)| *count)
            .unwrap_or(0);

        let misspelled: Vec<_> = insights
            .top_misspellings
            .iter()
            .map(|(token, count)| {
                let percent = if top == 0 { 0 } else { count * 100 / top };
                json!({ "token": token, "count": count, "percent": percent })
            })
            .collect();

        let typing_speed: Vec<_> = insights
            .last_speeds
            .iter()
            .map(|sample| {
                json!({
                    "date": sample.date.format("%Y-%m-%d").to_string(),
                    "wpm": sample.wpm,
                })
            })
            .collect();

        self.render(
            INSIGHTS,
            &json!({
                "title": "ThinkFast insights",
                "misspelled": misspelled,
                "typing_speed": typing_speed,
            }),
        )
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> Result<String> {
        self.registry
            .render(name, data)
            .map_err(|e| Error::Template(e.to_string()))
    }
}
