//! Per-step generation records and the usage ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome of a step or of a whole build.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

/// Audit trace of one pipeline step.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct GenerationRecord {
    /// Record identifier
    #[builder(default = "Uuid::new_v4()")]
    id: Uuid,
    /// Owning project
    project_id: Uuid,
    /// Step index (1-based)
    step: u8,
    /// Step name
    step_name: String,
    /// Provider that served the step
    provider: String,
    /// Prompt text sent
    prompt: String,
    /// Raw response text
    #[builder(default)]
    response: String,
    /// Extracted artifact
    #[builder(default)]
    code: String,
    /// Prompt tokens
    #[builder(default)]
    prompt_tokens: u64,
    /// Completion tokens
    #[builder(default)]
    completion_tokens: u64,
    /// Cost in USD
    #[builder(default)]
    cost: f64,
    /// Wall-clock duration of the step
    #[builder(default)]
    duration_ms: u64,
    /// Step outcome
    #[builder(default = "RunStatus::Completed")]
    status: RunStatus,
    /// Error message for failed steps
    #[builder(default, setter(into, strip_option))]
    error: Option<String>,
    /// Creation time
    #[builder(default = "Utc::now()")]
    created_at: DateTime<Utc>,
}

impl GenerationRecord {
    /// Creates a new record builder.
    pub fn builder() -> GenerationRecordBuilder {
        GenerationRecordBuilder::default()
    }
}

/// Append-only ledger entry for one billable provider call.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct UsageRecord {
    /// Entry identifier
    #[builder(default = "Uuid::new_v4()")]
    id: Uuid,
    /// Caller billed for the call
    owner_id: String,
    /// Project the call belonged to
    #[builder(default, setter(into, strip_option))]
    project_id: Option<Uuid>,
    /// Provider that served the call
    provider: String,
    /// Operation label, e.g. `generate_phase_3`
    operation: String,
    /// Input tokens
    #[builder(default)]
    input_tokens: u64,
    /// Output tokens
    #[builder(default)]
    output_tokens: u64,
    /// Cost in USD
    #[builder(default)]
    cost: f64,
    /// Creation time
    #[builder(default = "Utc::now()")]
    created_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Creates a new usage builder.
    pub fn builder() -> UsageRecordBuilder {
        UsageRecordBuilder::default()
    }
}

/// Counters folded from usage records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Number of billable calls
    pub requests: u64,
    /// Input tokens
    pub input_tokens: u64,
    /// Output tokens
    pub output_tokens: u64,
    /// Cost in USD
    pub cost: f64,
}

impl UsageTotals {
    /// Fold one record in.
    pub fn add(&mut self, record: &UsageRecord) {
        self.requests += 1;
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.cost += record.cost;
    }

    /// Input plus output tokens.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Aggregate over usage records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Number of billable calls
    pub total_requests: u64,
    /// Total input tokens
    pub input_tokens: u64,
    /// Total output tokens
    pub output_tokens: u64,
    /// Total cost in USD
    pub total_cost: f64,
    /// The same counters split by serving provider
    #[serde(default)]
    pub by_provider: BTreeMap<String, UsageTotals>,
}

impl UsageSummary {
    /// Fold one record into the summary.
    pub fn add(&mut self, record: &UsageRecord) {
        self.total_requests += 1;
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.total_cost += record.cost;
        self.by_provider
            .entry(record.provider.clone())
            .or_default()
            .add(record);
    }
}

/// Usage of one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// The day
    pub day: NaiveDate,
    /// Counters for that day
    #[serde(flatten)]
    pub totals: UsageTotals,
}

impl DailyUsage {
    /// Bucket records by UTC day, newest day first.
    pub fn bucket<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Vec<DailyUsage> {
        let mut days: BTreeMap<NaiveDate, UsageTotals> = BTreeMap::new();
        for record in records {
            days.entry(record.created_at.date_naive())
                .or_default()
                .add(record);
        }
        days.into_iter()
            .rev()
            .map(|(day, totals)| DailyUsage { day, totals })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn usage(provider: &str, tokens: u64, created_at: DateTime<Utc>) -> UsageRecord {
        UsageRecord::builder()
            .owner_id("alice")
            .provider(provider)
            .operation("generate_phase_1")
            .input_tokens(tokens)
            .output_tokens(tokens)
            .cost(0.5)
            .created_at(created_at)
            .build()
            .unwrap()
    }

    #[test]
    fn test_summary_splits_by_provider() {
        let now = Utc::now();
        let mut summary = UsageSummary::default();
        for record in [
            usage("deepseek", 10, now),
            usage("gemini", 4, now),
            usage("deepseek", 1, now),
        ] {
            summary.add(&record);
        }
        assert_eq!(summary.total_requests, 3);
        assert_eq!(summary.by_provider.len(), 2);
        let deepseek = summary.by_provider["deepseek"];
        assert_eq!(deepseek.requests, 2);
        assert_eq!(deepseek.total_tokens(), 22);
        assert_eq!(deepseek.cost, 1.0);
        assert_eq!(summary.by_provider["gemini"].input_tokens, 4);
    }

    #[test]
    fn test_daily_buckets_newest_first() {
        let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap();
        let records = [
            usage("deepseek", 1, day(1, 9)),
            usage("deepseek", 2, day(2, 0)),
            usage("gemini", 3, day(2, 23)),
        ];
        let daily = DailyUsage::bucket(&records);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].day, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(daily[0].totals.requests, 2);
        assert_eq!(daily[0].totals.input_tokens, 5);
        assert_eq!(daily[1].totals.requests, 1);
    }
}
