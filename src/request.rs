use std::path::{Path, PathBuf};

use clap::Args;
use validator::Validate;

use crate::validate::{validate_file_mode, validate_path_not_empty};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECONDS: u64 = 5;
pub const DEFAULT_OBJECT_STORE_CLI: &str = "aws";

/// What to fetch and where to put it
#[derive(Clone, Debug, PartialEq, Eq, Validate)]
pub struct FetchRequest {
    #[validate(length(min = 1, message = "source locator is empty"))]
    source_locator: String,

    #[validate(custom(function = "validate_path_not_empty"))]
    destination_path: PathBuf,
}

impl FetchRequest {
    pub fn new(source_locator: impl Into<String>, destination_path: impl Into<PathBuf>) -> Self {
        Self {
            source_locator: source_locator.into(),
            destination_path: destination_path.into(),
        }
    }

    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination_path
    }
}

/// How a fetch is carried out
#[derive(Clone, Debug, Args, Validate)]
pub struct FetchOptions {
    #[arg(
        long = "max-retries",
        default_value_t = DEFAULT_MAX_RETRIES,
        help = "Maximum number of transfer attempts"
    )]
    #[validate(range(min = 1, message = "at least one attempt is required"))]
    pub max_retries: u32,

    #[arg(
        long = "retry-delay",
        value_name = "SECONDS",
        default_value_t = DEFAULT_RETRY_DELAY_SECONDS,
        help = "Fixed delay between transfer attempts"
    )]
    pub retry_delay_seconds: u64,

    #[arg(
        long = "no-sign-request",
        env = "ARTIFETCH_NO_SIGN_REQUEST",
        help = "Do not sign object store requests (anonymous access)"
    )]
    pub anonymous_access: bool,

    #[arg(
        long = "region",
        env = "AWS_REGION",
        help = "Object store region (required for s3 locators)"
    )]
    pub region: Option<String>,

    #[arg(
        long = "aws-cli",
        env = "ARTIFETCH_AWS_CLI",
        default_value = DEFAULT_OBJECT_STORE_CLI,
        help = "Object store command line client used for s3 locators"
    )]
    pub object_store_cli: String,

    #[arg(
        long = "mode",
        value_parser = parse_mode,
        help = "Octal permission bits applied to the fetched file (e.g. 0755)"
    )]
    #[validate(custom(function = "validate_file_mode"))]
    pub mode: Option<u32>,

    #[arg(
        long = "skip-if-exists",
        value_name = "PATH",
        conflicts_with = "force",
        help = "Skip the fetch when this path exists instead of the destination"
    )]
    pub skip_if_exists: Option<PathBuf>,

    #[arg(long = "force", help = "Fetch even if the destination already exists")]
    pub force: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_seconds: DEFAULT_RETRY_DELAY_SECONDS,
            anonymous_access: false,
            region: None,
            object_store_cli: DEFAULT_OBJECT_STORE_CLI.to_string(),
            mode: None,
            skip_if_exists: None,
            force: false,
        }
    }
}

impl FetchOptions {
    pub fn presence(&self) -> Presence {
        if self.force {
            Presence::Ignore
        } else if let Some(marker) = &self.skip_if_exists {
            Presence::Marker(marker.clone())
        } else {
            Presence::Destination
        }
    }
}

/// Check deciding whether an artifact is already in place
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Presence {
    /// The destination path exists as a regular file
    Destination,
    /// Some other path exists, e.g. the directory an installer produces from the artifact
    Marker(PathBuf),
    /// Always transfer
    Ignore,
}

impl Presence {
    pub fn is_satisfied(&self, destination: &Path) -> bool {
        match self {
            Presence::Destination => destination.is_file(),
            Presence::Marker(path) => path.exists(),
            Presence::Ignore => false,
        }
    }
}

/// Parse octal permission bits such as `755` or `0o644`
fn parse_mode(value: &str) -> Result<u32, String> {
    let digits = value.trim();
    let digits = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
        .unwrap_or(digits);
    u32::from_str_radix(digits, 8).map_err(|err| format!("invalid octal mode '{value}': {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod fetch_request {
        use super::*;

        #[test]
        fn test_accepts_non_empty_fields() {
            let request = FetchRequest::new("s3://bucket/key", "/tmp/out");
            assert!(request.validate().is_ok());
        }

        #[test]
        fn test_rejects_empty_locator() {
            let err = FetchRequest::new("", "/tmp/out").validate().unwrap_err();
            assert!(err.field_errors().contains_key("source_locator"));
        }

        #[test]
        fn test_rejects_empty_destination() {
            let err = FetchRequest::new("https://example.com/f", "")
                .validate()
                .unwrap_err();
            assert!(err.field_errors().contains_key("destination_path"));
        }
    }

    mod fetch_options {
        use super::*;

        #[test]
        fn test_defaults() {
            let options = FetchOptions::default();
            assert_eq!(options.max_retries, 3);
            assert_eq!(options.retry_delay_seconds, 5);
            assert!(!options.anonymous_access);
            assert_eq!(options.region, None);
            assert!(options.validate().is_ok());
        }

        #[test]
        fn test_rejects_zero_retries() {
            let options = FetchOptions {
                max_retries: 0,
                ..FetchOptions::default()
            };
            let err = options.validate().unwrap_err();
            assert!(err.field_errors().contains_key("max_retries"));
        }

        #[test]
        fn test_rejects_out_of_range_mode() {
            let options = FetchOptions {
                mode: Some(0o17777),
                ..FetchOptions::default()
            };
            assert!(options.validate().is_err());
        }
    }

    mod presence {
        use super::*;

        #[test]
        fn test_force_wins() {
            let options = FetchOptions {
                force: true,
                ..FetchOptions::default()
            };
            assert_eq!(options.presence(), Presence::Ignore);
        }

        #[test]
        fn test_marker() {
            let options = FetchOptions {
                skip_if_exists: Some(PathBuf::from("/usr/local/cuda-11.8")),
                ..FetchOptions::default()
            };
            assert_eq!(
                options.presence(),
                Presence::Marker(PathBuf::from("/usr/local/cuda-11.8"))
            );
        }

        #[test]
        fn test_ignore_never_satisfied() {
            assert!(!Presence::Ignore.is_satisfied(Path::new("/")));
        }

        #[test]
        fn test_destination_directory_not_satisfied() {
            assert!(!Presence::Destination.is_satisfied(&std::env::temp_dir()));
        }

        #[test]
        fn test_marker_directory_satisfied() {
            let marker = Presence::Marker(std::env::temp_dir());
            assert!(marker.is_satisfied(Path::new("/no/such/file")));
        }
    }

    mod parse_mode {
        use super::*;

        #[test]
        fn test_plain_octal() {
            assert_eq!(parse_mode("0755"), Ok(0o755));
            assert_eq!(parse_mode("644"), Ok(0o644));
        }

        #[test]
        fn test_prefixed_octal() {
            assert_eq!(parse_mode("0o600"), Ok(0o600));
        }

        #[test]
        fn test_rejects_non_octal() {
            assert!(parse_mode("0789").is_err());
        }
    }
}
