/// Build metadata baked in by build.rs
pub struct BuildInfo;

impl BuildInfo {
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// YYYYMMDD.HHMMSS, UTC
    pub fn build_timestamp() -> &'static str {
        env!("BUILD_TIMESTAMP")
    }

    /// Full commit hash, "unknown" outside a git checkout
    pub fn git_hash() -> &'static str {
        env!("GIT_HASH")
    }

    pub fn git_hash_short() -> &'static str {
        env!("GIT_HASH_SHORT")
    }

    pub fn target_platform() -> &'static str {
        env!("TARGET_PLATFORM")
    }

    pub fn build_profile() -> &'static str {
        env!("BUILD_PROFILE")
    }

    /// One-line version for log output, e.g. `0.1.0 (20261018.120000, 1a2b3c4)`
    pub fn display_version() -> String {
        format!("{} ({}, {})", Self::version(), Self::build_timestamp(), Self::git_hash_short())
    }

    /// Multi-line report printed by `--build-info`
    pub fn detailed_info() -> String {
        format!(
            "{} {}\nBuilt: {}\nCommit: {}\nPlatform: {}\nProfile: {}",
            crate::config::APP_NAME,
            Self::version(),
            Self::build_timestamp(),
            Self::git_hash(),
            Self::target_platform(),
            Self::build_profile()
        )
    }
}
