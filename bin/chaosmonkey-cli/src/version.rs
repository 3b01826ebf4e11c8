//! ---
//! cm_section: "05-cli"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Build metadata for the --version banner."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
use serde::Serialize;

const IDEMPOTENT_PLACEHOLDER: &str = "VERGEN_IDEMPOTENT_OUTPUT";

/// Compile-time version metadata captured via `vergen`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub semver: String,
    pub git_sha: String,
    pub build_timestamp: String,
    pub target: String,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: captured(option_env!("VERGEN_GIT_SHA")),
            build_timestamp: captured(option_env!("VERGEN_BUILD_TIMESTAMP")),
            target: captured(option_env!("VERGEN_CARGO_TARGET_TRIPLE")),
        }
    }

    /// One-line banner printed by `--version`.
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "chaosmonkey {} ({}) {}/{}",
            self.semver,
            short_sha(&self.git_sha),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }

    /// Banner plus build details, shown with `--version -v`.
    #[must_use]
    pub fn extended(&self) -> String {
        format!(
            "{banner}\nBuilt: {built}\nTarget: {target}",
            banner = self.banner(),
            built = self.build_timestamp,
            target = self.target
        )
    }
}

/// vergen substitutes a placeholder when a value cannot be determined, for
/// instance when building outside a git checkout.
fn captured(value: Option<&str>) -> String {
    match value {
        Some(value) if !value.is_empty() && value != IDEMPOTENT_PLACEHOLDER => value.to_owned(),
        _ => "unknown".to_owned(),
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}
