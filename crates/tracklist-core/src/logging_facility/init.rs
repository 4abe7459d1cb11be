//! Subscriber installation.

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Overrides the profile's default filter, in `EnvFilter` syntax
pub const LOG_ENV_VAR: &str = "TRACKLIST_LOG";

/// Output profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable, debug level for tracklist crates
    Development,
    /// JSON lines, info level
    Production,
    /// In-memory capture, see [`init_test_capture`](super::init_test_capture)
    Test,
}

impl Profile {
    /// Parse a profile name as accepted by the CLI (`dev`, `prod`, `test`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Profile::Development),
            "prod" | "production" => Some(Profile::Production),
            "test" => Some(Profile::Test),
            _ => None,
        }
    }

    /// Filter used when `TRACKLIST_LOG` is unset
    pub fn default_directives(&self) -> &'static str {
        match self {
            Profile::Development | Profile::Test => {
                "warn,tracklist=debug,tracklist_core=debug,tracklist_store=debug,tracklist_engine=debug"
            }
            Profile::Production => {
                "warn,tracklist=info,tracklist_core=info,tracklist_store=info,tracklist_engine=info"
            }
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

/// Install the global subscriber for `profile`
///
/// Only the first call in a process takes effect; later calls are no-ops.
/// Output goes to stderr so command output on stdout stays machine-readable.
pub fn init(profile: Profile) {
    let installed = match profile {
        Profile::Development => tracing_subscriber::fmt()
            .with_env_filter(profile.filter())
            .with_writer(std::io::stderr)
            .finish()
            .try_init()
            .is_ok(),
        Profile::Production => tracing_subscriber::fmt()
            .json()
            .with_env_filter(profile.filter())
            .with_writer(std::io::stderr)
            .finish()
            .try_init()
            .is_ok(),
        Profile::Test => {
            super::init_test_capture();
            true
        }
    };
    if !installed {
        tracing::debug!(?profile, "subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init(Profile::Test);
        init(Profile::Test);
        init(Profile::Development);
    }

    #[test]
    fn test_profile_from_name() {
        assert_eq!(Profile::from_name("dev"), Some(Profile::Development));
        assert_eq!(Profile::from_name(" PROD "), Some(Profile::Production));
        assert_eq!(Profile::from_name("verbose"), None);
    }

    #[test]
    fn test_production_is_quieter_than_development() {
        assert!(Profile::Production.default_directives().contains("tracklist_engine=info"));
        assert!(Profile::Development.default_directives().contains("tracklist_engine=debug"));
    }
}
