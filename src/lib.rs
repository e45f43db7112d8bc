pub mod agent;
pub mod config;
pub mod output;
pub mod rules;
pub mod s3_log;
pub mod scanner;
pub mod signatures;
pub mod verdict;
pub mod version;

pub use agent::{AgentParser, AgentProfile, BuiltinAgentParser};
pub use config::{AgentLists, MinimumVersions, OutputConfig, ScannerConfig};
pub use output::format_result;
pub use s3_log::{S3LogEntry, S3LogParser};
pub use scanner::{ClassificationOutput, Scanner};
pub use signatures::{Signature, SignatureField, SignatureSet};
pub use verdict::SupportVerdict;
pub use version::compare_versions;
