//! Dashboard analytics. Read only; refreshed by voice message mutations.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::http::{ApiClient, RequestOptions};
use crate::query::{Query, QueryCache};

pub const RESOURCE: &str = "analytics";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "7d")]
    #[default]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
            TimeRange::Year => "1y",
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "90d" => Ok(TimeRange::Quarter),
            "1y" => Ok(TimeRange::Year),
            other => Err(format!("unknown range {} (expected 7d, 30d, 90d or 1y)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_messages: u64,
    #[serde(default)]
    pub responded_messages: u64,
    #[serde(default)]
    pub pending_messages: u64,
    /// Mean time from receipt to response, in seconds
    #[serde(default)]
    pub average_response_time: Option<f64>,
    /// Total audio length, in seconds
    #[serde(default)]
    pub total_duration: f64,
}

impl AnalyticsOverview {
    pub fn response_rate(&self) -> f64 {
        if self.total_messages == 0 {
            return 0.0;
        }
        self.responded_messages as f64 / self.total_messages as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub received: u64,
    #[serde(default)]
    pub responded: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageStats {
    pub series: Vec<DailyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsParams {
    pub view: &'static str,
    pub range: TimeRange,
}

#[derive(Debug, Clone)]
pub struct Analytics {
    api: ApiClient,
    cache: QueryCache,
    stale_time: Duration,
}

impl Analytics {
    pub fn new(api: ApiClient, cache: QueryCache, stale_time: Duration) -> Self {
        Self {
            api,
            cache,
            stale_time,
        }
    }

    /// `GET /analytics/overview?range=`
    pub fn overview(&self, range: TimeRange) -> Query<AnalyticsParams, AnalyticsOverview> {
        self.query("overview", range)
    }

    /// `GET /analytics/messages?range=`
    pub fn message_stats(&self, range: TimeRange) -> Query<AnalyticsParams, MessageStats> {
        self.query("messages", range)
    }

    fn query<T>(&self, view: &'static str, range: TimeRange) -> Query<AnalyticsParams, T>
    where
        T: serde::de::DeserializeOwned + Send + Sync + 'static,
    {
        let api = self.api.clone();
        let params = AnalyticsParams { view, range };
        Query::new(self.cache.clone(), RESOURCE, params, self.stale_time, move |p: AnalyticsParams| {
            let api = api.clone();
            async move {
                let options = RequestOptions::get().query("range", p.range.as_str());
                api.request_data(&format!("/analytics/{}", p.view), options).await
            }
        })
        .keep_previous_data()
    }
}
