//! ---
//! cm_section: "02-chaos-client"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Chaos strategy names and the default catalog."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
//! Chaos strategies tell Chaos Monkey how to "break" an instance.
//!
//! The server accepts any strategy name it has been configured with, so
//! [`Strategy`] is an open string type. The associated constants cover the
//! strategies Chaos Monkey ships with.
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of a chaos strategy. An empty strategy lets the server pick one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Strategy(Cow<'static, str>);

impl Strategy {
    /// Shuts down the instance through the cloud provider API.
    pub const SHUTDOWN_INSTANCE: Strategy = Strategy::from_static("ShutdownInstance");
    /// Moves the instance into a security group that blocks all traffic.
    pub const BLOCK_ALL_NETWORK_TRAFFIC: Strategy = Strategy::from_static("BlockAllNetworkTraffic");
    /// Force-detaches all block storage volumes.
    pub const DETACH_VOLUMES: Strategy = Strategy::from_static("DetachVolumes");
    /// Runs CPU intensive processes. Requires SSH.
    pub const BURN_CPU: Strategy = Strategy::from_static("BurnCpu");
    /// Runs disk intensive processes. Requires SSH.
    pub const BURN_IO: Strategy = Strategy::from_static("BurnIo");
    /// Kills Java and Python processes every second. Requires SSH.
    pub const KILL_PROCESSES: Strategy = Strategy::from_static("KillProcesses");
    /// Null-routes the 10.0.0.0/8 network. Requires SSH.
    pub const NULL_ROUTE: Strategy = Strategy::from_static("NullRoute");
    /// Breaks EC2 API resolution through `/etc/hosts`. Requires SSH.
    pub const FAIL_EC2: Strategy = Strategy::from_static("FailEc2");
    /// Blocks port 53 over TCP and UDP. Requires SSH.
    pub const FAIL_DNS: Strategy = Strategy::from_static("FailDns");
    /// Breaks DynamoDB resolution through `/etc/hosts`. Requires SSH.
    pub const FAIL_DYNAMO_DB: Strategy = Strategy::from_static("FailDynamoDb");
    /// Breaks S3 resolution through `/etc/hosts`. Requires SSH.
    pub const FAIL_S3: Strategy = Strategy::from_static("FailS3");
    /// Fills the root device with a large file. Requires SSH.
    pub const FILL_DISK: Strategy = Strategy::from_static("FillDisk");
    /// Corrupts a large fraction of network packets. Requires SSH.
    pub const NETWORK_CORRUPTION: Strategy = Strategy::from_static("NetworkCorruption");
    /// Adds 1s (+/- 50%) latency to all packets. Requires SSH.
    pub const NETWORK_LATENCY: Strategy = Strategy::from_static("NetworkLatency");
    /// Drops a fraction of all network packets. Requires SSH.
    pub const NETWORK_LOSS: Strategy = Strategy::from_static("NetworkLoss");

    pub const fn from_static(name: &'static str) -> Self {
        Strategy(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Strategy(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the name is part of [`DEFAULT_STRATEGIES`].
    pub fn is_default(&self) -> bool {
        DEFAULT_STRATEGIES.iter().any(|known| known == self)
    }
}

/// Strategies supported by a stock Chaos Monkey installation.
pub static DEFAULT_STRATEGIES: [Strategy; 15] = [
    Strategy::SHUTDOWN_INSTANCE,
    Strategy::BLOCK_ALL_NETWORK_TRAFFIC,
    Strategy::DETACH_VOLUMES,
    Strategy::BURN_CPU,
    Strategy::BURN_IO,
    Strategy::KILL_PROCESSES,
    Strategy::NULL_ROUTE,
    Strategy::FAIL_EC2,
    Strategy::FAIL_DNS,
    Strategy::FAIL_DYNAMO_DB,
    Strategy::FAIL_S3,
    Strategy::FILL_DISK,
    Strategy::NETWORK_CORRUPTION,
    Strategy::NETWORK_LATENCY,
    Strategy::NETWORK_LOSS,
];

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Strategy {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Strategy {
    fn from(value: String) -> Self {
        Strategy::new(value)
    }
}

impl From<&str> for Strategy {
    fn from(value: &str) -> Self {
        Strategy::new(value)
    }
}

impl FromStr for Strategy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Strategy::new(s))
    }
}
