//! S3 server access log extraction.
//!
//! Each line is `owner bucket [time] remote-ip requester request-id operation
//! key "request-uri" status error bytes size total-time turnaround "referrer"
//! "user-agent" version-id`. Only the bucket, remote IP and User-Agent are
//! kept.

use anyhow::Context;
use regex::Regex;

const S3_LOG_PATTERN: &str = concat!(
    r"^(?:.*?) (?P<bucket>.*?) \[(?:.*?)\] (?P<remote_ip>.*?) ",
    r"(?:.*?) (?:.*?) (?:.*?) (?:.*?) ",
    r#""(?:.*?)" "#,
    r"(?:.*?) (?:.*?) (?:.*?) (?:.*?) (?:.*?) (?:.*?) ",
    r#""(?:.*?)" "(?P<user_agent>.*?)" (?:.*)$"#,
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3LogEntry {
    pub bucket: String,
    pub remote_ip: String,
    pub user_agent: String,
}

pub struct S3LogParser {
    pattern: Regex,
}

impl S3LogParser {
    pub fn new() -> anyhow::Result<Self> {
        let pattern = Regex::new(S3_LOG_PATTERN).context("invalid S3 access log pattern")?;
        Ok(S3LogParser { pattern })
    }

    /// `None` for lines that are not well-formed access log records.
    pub fn parse_line(&self, line: &str) -> Option<S3LogEntry> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = self.pattern.captures(line)?;

        Some(S3LogEntry {
            bucket: caps["bucket"].to_string(),
            remote_ip: caps["remote_ip"].to_string(),
            user_agent: caps["user_agent"].to_string(),
        })
    }
}
