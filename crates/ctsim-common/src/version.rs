//! ---
//! ctsim_section: "01-core-functionality"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Build and version metadata."
//! ctsim_version: "v0.0.0-prealpha"
//! ctsim_owner: "tbd"
//! ---
use serde::Serialize;

/// Version metadata reported by `--version` and the startup banner.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub semver: String,
    /// Git commit when provided by the build environment.
    pub git_sha: String,
    pub profile: String,
}

impl VersionInfo {
    #[must_use]
    pub fn current() -> Self {
        Self {
            semver: env!("CARGO_PKG_VERSION").to_owned(),
            git_sha: option_env!("CTSIM_GIT_SHA").unwrap_or("UNKNOWN").to_owned(),
            profile: if cfg!(debug_assertions) {
                "debug".to_owned()
            } else {
                "release".to_owned()
            },
        }
    }

    #[must_use]
    pub fn banner(&self) -> String {
        format!("CT simulator v{} (git {})", self.semver, self.git_sha)
    }

    /// Extended string suitable for `--version` flags.
    #[must_use]
    pub fn extended(&self) -> String {
        format!("{}\nProfile: {}", self.banner(), self.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_contains_semver() {
        let info = VersionInfo::current();
        assert!(info.extended().contains(&info.semver));
    }
}
