//! Usage analytics of the active project.
//!
//! Distributions cover the last seven days of executions; timeseries cover
//! today at minute resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dispatcher::QueryParams;
use crate::resources::Scoped;

/// Execution count for one app or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionDatapoint {
    pub name: String,
    pub value: f64,
}

/// Execution counts for one minute, keyed by app or function name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesDatapoint {
    /// `YYYY-MM-DD HH:MM`.
    pub date: String,
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
}

impl TimeSeriesDatapoint {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

pub struct Analytics<'a> {
    scoped: Scoped<'a>,
}

impl<'a> Analytics<'a> {
    pub(crate) fn new(scoped: Scoped<'a>) -> Self {
        Self { scoped }
    }

    pub async fn app_usage_distribution(&self) -> crate::Result<Vec<DistributionDatapoint>> {
        self.fetch("app-usage-distribution").await
    }

    pub async fn function_usage_distribution(&self) -> crate::Result<Vec<DistributionDatapoint>> {
        self.fetch("function-usage-distribution").await
    }

    pub async fn app_usage_timeseries(&self) -> crate::Result<Vec<TimeSeriesDatapoint>> {
        self.fetch("app-usage-timeseries").await
    }

    pub async fn function_usage_timeseries(&self) -> crate::Result<Vec<TimeSeriesDatapoint>> {
        self.fetch("function-usage-timeseries").await
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, report: &str) -> crate::Result<Vec<T>> {
        self.scoped
            .get(&["analytics", report], &QueryParams::new())
            .await
    }
}
