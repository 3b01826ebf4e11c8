//! ---
//! cm_section: "05-cli"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Table and JSON rendering for events and groups."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use anyhow::Result;
use chaosmonkey::ChaosEvent;
use chrono::SecondsFormat;
use clap::ValueEnum;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::groups::GroupSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

const EVENT_HEADER: [&str; 5] = [
    "InstanceID",
    "AutoScalingGroupName",
    "Region",
    "Strategy",
    "TriggeredAt",
];

const GROUP_HEADER: [&str; 5] = [
    "AutoScalingGroupName",
    "InService",
    "Desired",
    "Min",
    "Max",
];

/// Render a batch of events, such as the result of a list call.
pub fn render_events(events: &[ChaosEvent], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(event_table(events, true)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(events)?),
    }
}

/// Render one event as it arrives during a campaign. Tables carry the header
/// only when `include_header` is set; JSON is one object per line.
pub fn render_event(event: &ChaosEvent, format: OutputFormat, include_header: bool) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(event_table(std::slice::from_ref(event), include_header)),
        OutputFormat::Json => Ok(serde_json::to_string(event)?),
    }
}

pub fn render_groups(groups: &[GroupSummary], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let rows = groups.iter().map(|group| {
                vec![
                    group.name.clone(),
                    group.instances_in_service.to_string(),
                    group.desired_capacity.to_string(),
                    group.min_size.to_string(),
                    group.max_size.to_string(),
                ]
            });
            Ok(table(Some(GROUP_HEADER), rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(groups)?),
    }
}

fn event_table(events: &[ChaosEvent], include_header: bool) -> String {
    let rows = events.iter().map(|event| {
        vec![
            event.instance_id.clone(),
            event.group_name.clone(),
            event.region.clone(),
            event.strategy.to_string(),
            event.triggered_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ]
    });
    table(include_header.then_some(EVENT_HEADER), rows)
}

fn table(header: Option<[&str; 5]>, rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut builder = Builder::default();
    if let Some(header) = header {
        builder.push_record(header);
    }
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::blank());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use chaosmonkey::Strategy;
    use chrono::DateTime;

    use super::*;

    fn event(id: &str) -> ChaosEvent {
        ChaosEvent {
            instance_id: id.to_owned(),
            group_name: "web".into(),
            region: "us-west-2".into(),
            strategy: Strategy::SHUTDOWN_INSTANCE,
            triggered_at: DateTime::from_timestamp(1_460_116_927, 0).unwrap(),
        }
    }

    #[test]
    fn table_lists_events_under_header() {
        let rendered = render_events(&[event("i-1"), event("i-2")], OutputFormat::Table).unwrap();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("InstanceID"));
        assert!(lines[1].contains("i-1"));
        assert!(lines[2].contains("2016-04-08T12:02:07Z"));
    }

    #[test]
    fn header_is_optional_for_streamed_events() {
        let with = render_event(&event("i-1"), OutputFormat::Table, true).unwrap();
        let without = render_event(&event("i-1"), OutputFormat::Table, false).unwrap();
        assert_eq!(with.lines().count(), 2);
        assert_eq!(without.lines().count(), 1);
        assert!(!without.contains("InstanceID"));
    }

    #[test]
    fn json_event_is_single_line() {
        let rendered = render_event(&event("i-1"), OutputFormat::Json, true).unwrap();
        assert!(!rendered.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["instance_id"], "i-1");
        assert_eq!(value["strategy"], "ShutdownInstance");
    }

    #[test]
    fn groups_table_has_counts() {
        let groups = vec![GroupSummary {
            name: "web".into(),
            instances_in_service: 2,
            desired_capacity: 3,
            min_size: 1,
            max_size: 5,
        }];
        let rendered = render_groups(&groups, OutputFormat::Table).unwrap();
        let row = rendered.lines().nth(1).unwrap();
        let cells: Vec<_> = row.split_whitespace().collect();
        assert_eq!(cells, ["web", "2", "3", "1", "5"]);
    }
}
