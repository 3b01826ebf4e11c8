//! ---
//! cm_section: "05-cli"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Auto scaling group inventory."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
//! Group inventory read from the JSON printed by
//! `aws autoscaling describe-auto-scaling-groups`.
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const IN_SERVICE: &str = "InService";

/// One auto scaling group and its capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub instances_in_service: usize,
    pub desired_capacity: u32,
    pub min_size: u32,
    pub max_size: u32,
}

/// Source of auto scaling groups.
pub trait GroupDirectory {
    /// All groups, sorted by name.
    fn groups(&self) -> Result<Vec<GroupSummary>>;
}

/// Saved `describe-auto-scaling-groups` output. `-` reads standard input.
#[derive(Debug, Clone)]
pub enum DescribeOutput {
    Stdin,
    File(PathBuf),
}

impl DescribeOutput {
    pub fn new(path: &Path) -> Self {
        if path == Path::new("-") {
            Self::Stdin
        } else {
            Self::File(path.to_path_buf())
        }
    }

    fn read(&self) -> Result<String> {
        match self {
            Self::Stdin => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("unable to read group inventory from stdin")?;
                Ok(buffer)
            }
            Self::File(path) => fs::read_to_string(path)
                .with_context(|| format!("unable to read group inventory {}", path.display())),
        }
    }
}

impl GroupDirectory for DescribeOutput {
    fn groups(&self) -> Result<Vec<GroupSummary>> {
        parse_groups(&self.read()?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDocument {
    auto_scaling_groups: Vec<GroupRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupRecord {
    auto_scaling_group_name: String,
    #[serde(default)]
    instances: Vec<InstanceRecord>,
    #[serde(default)]
    desired_capacity: u32,
    #[serde(default)]
    min_size: u32,
    #[serde(default)]
    max_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceRecord {
    #[serde(default)]
    lifecycle_state: String,
}

pub fn parse_groups(json: &str) -> Result<Vec<GroupSummary>> {
    let document: DescribeDocument =
        serde_json::from_str(json).context("invalid describe-auto-scaling-groups output")?;
    let mut groups: Vec<_> = document
        .auto_scaling_groups
        .into_iter()
        .map(|record| GroupSummary {
            instances_in_service: record
                .instances
                .iter()
                .filter(|instance| instance.lifecycle_state == IN_SERVICE)
                .count(),
            name: record.auto_scaling_group_name,
            desired_capacity: record.desired_capacity,
            min_size: record.min_size,
            max_size: record.max_size,
        })
        .collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(groups)
}
