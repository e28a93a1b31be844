//! Daily/weekly summary report rendering
//!
//! Renders a markdown summary (top topics plus top-weighted headlines) from
//! an embedded Handlebars template. The engine supplies the aggregated
//! rows; this module only shapes and renders them.

use chrono::NaiveDate;
use handlebars::Handlebars;
use serde::Serialize;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default report template
const REPORT_TEMPLATE: &str = include_str!("../../templates/report.hbs");

/// Report cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Daily,
    Weekly,
}

impl FromStr for ReportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(Error::unsupported("reportType", other)),
        }
    }
}

impl ReportType {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Daily => "Daily news summary",
            Self::Weekly => "Weekly news summary",
        }
    }

    /// Days covered when the caller supplies no explicit range
    pub fn default_days(&self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
        }
    }
}

/// One topic row in the report
#[derive(Debug, Clone, Serialize)]
pub struct TopicRow {
    pub position: usize,
    pub name: String,
    pub mentions: u64,
}

/// One highlighted headline
#[derive(Debug, Clone, Serialize)]
pub struct HighlightRow {
    pub title: String,
    pub platform: String,
    pub weight: String,
}

/// Template data for rendering
#[derive(Debug, Serialize)]
pub struct ReportData {
    pub title: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub generated_at: String,
    pub batch_count: usize,
    pub topics: Vec<TopicRow>,
    pub highlights: Vec<HighlightRow>,
}

/// Report renderer with the embedded template registered
pub struct ReportRenderer<'a> {
    handlebars: Handlebars<'a>,
}

impl<'a> ReportRenderer<'a> {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string("report", REPORT_TEMPLATE)
            .map_err(|e| Error::config(format!("failed to register report template: {e}")))?;
        Ok(Self { handlebars })
    }

    pub fn render(&self, data: &ReportData) -> Result<String> {
        Ok(self.handlebars.render("report", data)?)
    }
}
