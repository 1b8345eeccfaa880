// Public modules
pub mod types;
pub mod config;
pub mod format;
pub mod fetch;
pub mod slack;
pub mod services;
pub mod report;

// Re-export commonly used items
pub use types::*;
pub use config::{load_options, load_options_with_env, read_config, EnvironmentProvider, SystemEnvironment, MockEnvironment, RunOptions};
pub use format::{capitalize, encode_uri, slack_link};
pub use fetch::{fetch_json, Method};
pub use slack::{build_slack_payload, send_to_slack};
pub use services::{build_services, Service, ValidationError};
pub use services::{ArgoCdService, GithubActionsService, GithubPrsService, SnykService};
pub use report::{collect_results, parse_report};
