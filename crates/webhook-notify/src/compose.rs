//! Message composition from aggregated stock data and run metadata.

use std::str::FromStr;

use stockwatch_core::{AggregateSummary, AvailabilityRecord};

use crate::message::{Field, Footer, Message};

const TITLE: &str = "Stock Levels";
const TOTAL_FIELD: &str = "Total Stock";
const DEFAULT_RUNS_BASE_URL: &str = "https://github.com/stockwatch-bot/stockwatch/runs";

/// Whether the field list carries one entry per store or one per state.
/// The observed site traffic supports either reading; it is a policy choice,
/// not something derivable from the payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldGranularity {
    #[default]
    PerLocation,
    PerState,
}

impl FromStr for FieldGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-location" | "location" => Ok(Self::PerLocation),
            "per-state" | "state" => Ok(Self::PerState),
            other => Err(format!(
                "unknown field granularity '{other}' (expected per-location or per-state)"
            )),
        }
    }
}

/// Optional provenance carried into the footer.
#[derive(Clone, Debug, Default)]
pub struct RunMetadata {
    pub reference: Option<String>,
    pub run_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NotificationComposer {
    granularity: FieldGranularity,
    runs_base_url: String,
    mention: Option<String>,
}

impl Default for NotificationComposer {
    fn default() -> Self {
        Self::new(FieldGranularity::default(), None)
    }
}

impl NotificationComposer {
    pub fn new(granularity: FieldGranularity, mention: Option<String>) -> Self {
        Self {
            granularity,
            runs_base_url: DEFAULT_RUNS_BASE_URL.to_string(),
            mention,
        }
    }

    pub fn with_runs_base_url(mut self, base: impl Into<String>) -> Self {
        self.runs_base_url = base.into();
        self
    }

    /// Build the notification message. Never fails: zero records compose to a
    /// single total field valued `"0"`.
    pub fn compose(
        &self,
        summary: &AggregateSummary,
        records: &[AvailabilityRecord],
        metadata: &RunMetadata,
    ) -> Message {
        let mut fields = Vec::with_capacity(1 + records.len());
        fields.push(Field {
            name: TOTAL_FIELD.to_string(),
            value: summary.total_available.to_string(),
            inline: false,
        });

        match self.granularity {
            FieldGranularity::PerLocation => {
                for record in records {
                    let label = record.name.as_deref().unwrap_or(&record.state_name);
                    fields.push(Field {
                        name: format!("{label} ({})", record.state_id),
                        value: record.available.to_string(),
                        inline: true,
                    });
                }
            }
            FieldGranularity::PerState => {
                for state in &summary.per_state {
                    fields.push(Field {
                        name: format!("{} ({})", state.name, state.id),
                        value: state.total.to_string(),
                        inline: true,
                    });
                }
            }
        }

        Message {
            content: self.mention.clone(),
            title: TITLE.to_string(),
            fields,
            footer: self.footer(metadata),
        }
    }

    fn footer(&self, metadata: &RunMetadata) -> Option<Footer> {
        let reference = metadata.reference.as_ref()?;
        Some(Footer {
            text: Some(format!("via ref {reference}")),
            url: metadata
                .run_id
                .as_ref()
                .map(|id| format!("{}/{id}", self.runs_base_url)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::{aggregate, parse};

    fn two_store_sample() -> (AggregateSummary, Vec<AvailabilityRecord>) {
        let payload = parse(
            r#"{"stocks":[{"id":1,"name":"NSW","locations":[
                {"name":"Store A","available":"5"},
                {"name":"Store B","available":"3"}
            ]}]}"#,
        )
        .unwrap();
        let aggregation = aggregate(&payload);
        (aggregation.summary, aggregation.records)
    }

    #[test]
    fn zero_records_compose_to_single_total_field() {
        let message = NotificationComposer::default().compose(
            &AggregateSummary {
                total_available: 0,
                per_state: Vec::new(),
            },
            &[],
            &RunMetadata::default(),
        );

        assert_eq!(message.fields.len(), 1);
        assert_eq!(message.fields[0].name, "Total Stock");
        assert_eq!(message.fields[0].value, "0");
        assert!(!message.fields[0].inline);
        assert!(message.footer.is_none());
    }

    #[test]
    fn per_location_granularity_emits_one_field_per_store() {
        let (summary, records) = two_store_sample();
        let message = NotificationComposer::default().compose(
            &summary,
            &records,
            &RunMetadata::default(),
        );

        assert_eq!(message.fields.len(), 3);
        assert_eq!(message.fields[0].value, "8");
        assert_eq!(message.fields[1].name, "Store A (1)");
        assert_eq!(message.fields[1].value, "5");
        assert!(message.fields[1].inline);
        assert_eq!(message.fields[2].name, "Store B (1)");
        assert_eq!(message.fields[2].value, "3");
    }

    #[test]
    fn per_state_granularity_emits_one_field_per_state() {
        let (summary, records) = two_store_sample();
        let message = NotificationComposer::new(FieldGranularity::PerState, None).compose(
            &summary,
            &records,
            &RunMetadata::default(),
        );

        assert_eq!(message.fields.len(), 2);
        assert_eq!(message.fields[1].name, "NSW (1)");
        assert_eq!(message.fields[1].value, "8");
    }

    #[test]
    fn footer_requires_reference() {
        let (summary, records) = two_store_sample();
        let composer = NotificationComposer::default().with_runs_base_url("https://ci.example.com/runs");

        let without = composer.compose(
            &summary,
            &records,
            &RunMetadata {
                reference: None,
                run_id: Some("42".into()),
            },
        );
        assert!(without.footer.is_none());

        let with = composer.compose(
            &summary,
            &records,
            &RunMetadata {
                reference: Some("main".into()),
                run_id: Some("42".into()),
            },
        );
        let footer = with.footer.unwrap();
        assert_eq!(footer.text.as_deref(), Some("via ref main"));
        assert_eq!(footer.url.as_deref(), Some("https://ci.example.com/runs/42"));
    }

    #[test]
    fn mention_becomes_content_line() {
        let message = NotificationComposer::new(
            FieldGranularity::PerLocation,
            Some("<@123>".into()),
        )
        .compose(
            &AggregateSummary {
                total_available: 0,
                per_state: Vec::new(),
            },
            &[],
            &RunMetadata::default(),
        );
        assert_eq!(message.content.as_deref(), Some("<@123>"));
    }

    #[test]
    fn granularity_parses_from_str() {
        assert_eq!(
            "per-location".parse::<FieldGranularity>().unwrap(),
            FieldGranularity::PerLocation
        );
        assert_eq!(
            "PER-STATE".parse::<FieldGranularity>().unwrap(),
            FieldGranularity::PerState
        );
        assert!("rows".parse::<FieldGranularity>().is_err());
    }
}
