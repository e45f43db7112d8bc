use crate::agent::{AgentParser, BuiltinAgentParser};
use crate::config::ScannerConfig;
use crate::output::{format_result, render_label};
use crate::rules::RuleSet;
use crate::signatures::{is_null_agent, MatchResult, SignatureField, SignatureSet};
use crate::verdict::SupportVerdict;
use crate::version::{self, compare_versions};
use anyhow::Context;
use serde::Serialize;

pub const EMPTY_USER_AGENT: &str = "Empty_UserAgent";
pub const NULL_USER_AGENT: &str = "Null_UserAgent";

/// Result of classifying one UA string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationOutput {
    pub verdict: SupportVerdict,
    /// Signature name or browser family, unrendered.
    pub label: String,
    pub identified: bool,
    /// The URL-decoded input.
    pub raw_input: String,
}

impl ClassificationOutput {
    fn new(verdict: SupportVerdict, label: &str, identified: bool, raw_input: String) -> Self {
        ClassificationOutput {
            verdict,
            label: label.to_string(),
            identified,
            raw_input,
        }
    }

    /// JSON form: the verdict name plus its output code, and the rendered label.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "verdict": self.verdict,
            "code": self.verdict.code(),
            "label": render_label(&self.label),
            "identified": self.identified,
            "raw_input": self.raw_input,
        })
    }

    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }
}

/// JVM family a Java VM name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VmKind {
    Java,
    HotSpot,
    Dalvik,
    Unlisted,
}

/// Immutable classifier: configuration, signature list, generic parser and
/// rule tables, all fixed at construction. Safe to share across threads.
pub struct Scanner {
    config: ScannerConfig,
    signatures: SignatureSet,
    parser: Box<dyn AgentParser>,
    rules: RuleSet,
}

impl Scanner {
    /// Build a scanner with the built-in generic parser.
    ///
    /// Fails if the version comparison self-check does not pass.
    pub fn new(config: ScannerConfig) -> anyhow::Result<Self> {
        let parser = BuiltinAgentParser::new().context("failed to build agent parser")?;
        Self::with_parser(config, Box::new(parser))
    }

    pub fn with_parser(config: ScannerConfig, parser: Box<dyn AgentParser>) -> anyhow::Result<Self> {
        version::self_check()?;
        let signatures = SignatureSet::builtin().context("failed to build signature set")?;
        let rules = RuleSet::from_config(&config);

        log::debug!("scanner ready with {} signatures", signatures.len());

        Ok(Scanner {
            config,
            signatures,
            parser,
            rules,
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn classify(&self, ua: &str) -> ClassificationOutput {
        let matched = self.signatures.match_agent(ua);

        if let Some(name) = matched.name() {
            let verdict = self.signature_verdict(&matched);
            log::debug!("signature {name} resolved to {verdict:?}");
            return ClassificationOutput::new(verdict, name, true, matched.decoded);
        }

        let decoded = matched.decoded;
        if decoded.trim().is_empty() {
            return ClassificationOutput::new(SupportVerdict::Unknown, EMPTY_USER_AGENT, true, decoded);
        }
        if is_null_agent(&decoded) {
            return ClassificationOutput::new(SupportVerdict::Unknown, NULL_USER_AGENT, true, decoded);
        }

        let profile = self.parser.parse(&decoded).normalized();
        let eval = self.rules.evaluate(&profile);

        log::debug!(
            "merged {:?} (os {:?} {}/{}, browser {:?} {}/{})",
            eval.overall,
            eval.os,
            profile.os_family,
            profile.os_version,
            eval.browser,
            profile.browser_family,
            profile.browser_version
        );
        if !eval.identified() {
            log::debug!(
                "not identified (os: {}, browser: {}): {decoded}",
                eval.os_identified,
                eval.browser_identified
            );
        }

        ClassificationOutput::new(
            eval.overall,
            &profile.browser_family,
            eval.identified(),
            decoded,
        )
    }

    /// Classify and render the result line using the configured output flags.
    pub fn classify_to_string(&self, ua: &str) -> String {
        let result = self.classify(ua);
        format_result(
            result.verdict,
            result.identified,
            &result.label,
            &result.raw_input,
            &self.config.output,
        )
    }

    /// Verdict and rendered label only.
    pub fn classify_short(&self, ua: &str) -> (SupportVerdict, String) {
        let result = self.classify(ua);
        (result.verdict, render_label(&result.label))
    }

    fn signature_verdict(&self, matched: &MatchResult<'_>) -> SupportVerdict {
        let mvr = &self.config.minimum_versions;
        let agents = &self.config.agents;

        match matched.name() {
            Some("aws-sdk-java") => {
                let (vm, vm_version) = self.java_vm(matched);
                if vm.is_empty() || vm_version.is_empty() {
                    return SupportVerdict::Unknown;
                }
                let required = match self.vm_kind(vm) {
                    VmKind::Java => &mvr.java_vm,
                    VmKind::HotSpot => &mvr.hotspot_vm,
                    VmKind::Dalvik => &mvr.dalvik_vm,
                    VmKind::Unlisted => return SupportVerdict::Unknown,
                };
                log::debug!("java vm {vm} {vm_version} >= {required}");
                compare_versions(vm_version, required)
            }
            Some("aws-sdk-android") => {
                let (vm, vm_version) = self.java_vm(matched);
                if vm.is_empty() || vm_version.is_empty() {
                    return SupportVerdict::Unknown;
                }
                compare_versions(vm_version, &mvr.dalvik_vm)
            }
            Some("aws-sdk-iOS") => {
                match (
                    matched.field(SignatureField::Os),
                    matched.field(SignatureField::OsVersion),
                ) {
                    (Some("iPhone-OS"), Some(os_version)) => {
                        compare_versions(os_version, &mvr.aws_sdk_ios)
                    }
                    _ => SupportVerdict::Unknown,
                }
            }
            Some(name) if agents.supported_signatures.iter().any(|s| s == name) => {
                SupportVerdict::Supported
            }
            Some(name) if agents.unsupported_signatures.iter().any(|s| s == name) => {
                SupportVerdict::NotSupported
            }
            _ => SupportVerdict::Unknown,
        }
    }

    fn vm_kind(&self, vm: &str) -> VmKind {
        let agents = &self.config.agents;
        let listed = |list: &[String]| list.iter().any(|v| v == vm);

        if listed(&agents.java_vms) {
            VmKind::Java
        } else if listed(&agents.hotspot_vms) {
            VmKind::HotSpot
        } else if listed(&agents.dalvik_vms) {
            VmKind::Dalvik
        } else {
            VmKind::Unlisted
        }
    }

    /// Java VM name and the version that matters for its family.
    ///
    /// Java VMs report the Java version in `java_version`; HotSpot and Dalvik
    /// report it in `java_vm_version`. `Dalvik/1.4` carries its own version.
    fn java_vm<'a>(&self, matched: &'a MatchResult<'_>) -> (&'a str, &'a str) {
        let Some(signature) = matched.signature else {
            return ("", "");
        };
        if !signature.has_field(SignatureField::JavaVm) {
            return ("", "");
        }

        let vm = matched.field(SignatureField::JavaVm).unwrap_or("");
        let field_or_empty = |field| {
            if signature.has_field(field) {
                Some(matched.field(field).unwrap_or(""))
            } else {
                None
            }
        };

        if let Some((name, version)) = vm.split_once('/') {
            if self.vm_kind(name) == VmKind::Dalvik {
                return (name, version);
            }
        }

        let version = match self.vm_kind(vm) {
            VmKind::Java => field_or_empty(SignatureField::JavaVersion)
                .or_else(|| field_or_empty(SignatureField::JavaVmVersion)),
            VmKind::HotSpot | VmKind::Dalvik => field_or_empty(SignatureField::JavaVmVersion)
                .or_else(|| field_or_empty(SignatureField::JavaVersion)),
            VmKind::Unlisted => None,
        };

        (vm, version.unwrap_or(""))
    }
}
