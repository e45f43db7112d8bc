use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Scanner configuration. Read once at startup and never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub output: OutputConfig,
    pub minimum_versions: MinimumVersions,
    pub agents: AgentLists,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix each result with `T` or `F` for identified / not identified.
    pub identify_unknown: bool,
    /// Append the raw input in brackets.
    pub verbose: bool,
}

/// Minimum version required per client family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimumVersions {
    pub java_vm: String,
    pub hotspot_vm: String,
    pub dalvik_vm: String,
    pub aws_sdk_ios: String,
    pub windows_phone: String,
    pub mac_os_x: String,
    pub ios: String,
    pub android: String,
    pub blackberry_os: String,
    pub blackberry_tablet_os: String,
    pub netscape: String,
    pub firefox: String,
    pub thunderbird: String,
    pub opera: String,
    pub konqueror: String,
    pub safari: String,
    pub ie: String,
    pub chrome: String,
    pub android_browser: String,
    pub outlook: String,
}

impl Default for MinimumVersions {
    fn default() -> Self {
        MinimumVersions {
            java_vm: "1.6.0_29".to_string(),
            hotspot_vm: "21".to_string(),
            dalvik_vm: "1.4".to_string(),
            aws_sdk_ios: "3".to_string(),
            windows_phone: "7".to_string(),
            mac_os_x: "10.5".to_string(),
            ios: "3".to_string(),
            android: "2.3".to_string(),
            blackberry_os: "5".to_string(),
            blackberry_tablet_os: "2.3".to_string(),
            netscape: "7.1".to_string(),
            firefox: "1.5".to_string(),
            thunderbird: "5".to_string(),
            opera: "6".to_string(),
            konqueror: "3.5.6".to_string(),
            safari: "3".to_string(),
            ie: "6".to_string(),
            chrome: "38".to_string(),
            android_browser: "2.3".to_string(),
            outlook: "2003".to_string(),
        }
    }
}

/// Name lists that route signatures, families, VMs and device models to rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLists {
    pub supported_signatures: Vec<String>,
    pub unsupported_signatures: Vec<String>,
    pub supported_bots: Vec<String>,
    pub depends_on_os: Vec<String>,
    pub chrome_family: Vec<String>,
    pub firefox_family: Vec<String>,
    pub java_vms: Vec<String>,
    pub hotspot_vms: Vec<String>,
    pub dalvik_vms: Vec<String>,
    /// Windows major versions (or release names) known to support SHA-256.
    pub windows_supported: Vec<String>,
    pub windows_unsupported: Vec<String>,
    pub blackberry_supported_models: Vec<String>,
    pub blackberry_unsupported_models: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for AgentLists {
    fn default() -> Self {
        AgentLists {
            supported_signatures: strings(&[
                "aws-internal",
                "S3_Console",
                "Amazon_CloudFront",
                "Akamai_Edge",
                "Google_ImageBot",
                "Google_ADsBot",
                "CloudFlare_AlwaysOnline",
                "Facebook_Platform",
                "image_coccoc",
                "MSNBot_Media",
                "Exabot",
                "Slackbot",
                "Slack_ImgProxy",
                "Slackbot_LinkExpanding",
                "ElasticBeanstalk",
            ]),
            unsupported_signatures: Vec::new(),
            supported_bots: strings(&[
                "bingbot",
                "FacebookBot",
                "Slurp",
                "LinkedInBot",
                "TwitterBot",
                "Googlebot",
            ]),
            depends_on_os: strings(&["Silk", "Lightning"]),
            chrome_family: strings(&[
                "Chrome",
                "Chromium",
                "Chrome Mobile",
                "Chrome Mobile iOS",
                "Iron",
                "Comodo Dragon",
            ]),
            firefox_family: strings(&[
                "Firefox",
                "Firefox Alpha",
                "Firefox Beta",
                "Firefox Mobile",
                "Iceweasel",
                "Swiftfox",
                "Swiftweasel",
                "Waterfox",
                "TenFourFox",
            ]),
            java_vms: strings(&[
                "OpenJDK_64-Bit_Server_VM",
                "IBM_J9_VM",
                "OpenJDK_Client_VM",
                "OpenJDK_Server_VM",
                "Oracle_JRockit(R)",
                "TwitterJDK_64-Bit_Server_VM",
                "JVM",
            ]),
            hotspot_vms: strings(&[
                "Java_HotSpot(TM)_64-Bit_Client_VM",
                "Java_HotSpot(TM)_64-Bit_Server_VM",
                "Java_HotSpot(TM)_Client_VM",
                "Java_HotSpot(TM)_Server_VM",
            ]),
            dalvik_vms: strings(&["Dalvik"]),
            windows_supported: strings(&["7", "8", "RT", "Vista", "10"]),
            windows_unsupported: strings(&["3", "95", "98", "CE", "ME", "NT2000"]),
            blackberry_supported_models: strings(&[
                "8520", "8530", "8900", "8910", "8980", "9000", "9700", "9650", "9630", "9520",
                "9550", "9500", "9530", "9780", "9788", "9100", "9105", "9670", "9300", "9330",
                "9800", "9320", "9220", "9350", "9360", "9370", "9380", "9850", "9860", "9810",
                "9981", "9720", "9900", "9930", "9790",
            ]),
            blackberry_unsupported_models: strings(&[
                "7100", "7250", "8100", "8310", "8320", "8800", "8820", "8830", "8110", "8120",
                "8130", "8220", "8230", "8300", "8330", "8350", "7200", "7500", "7700", "5000",
                "6000", "850", "857", "950", "957",
            ]),
        }
    }
}

impl ScannerConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration file '{path}'"))?;
        let config: ScannerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse configuration file '{path}'"))?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write configuration file '{path}'"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = ScannerConfig::default();
        assert_eq!(config.minimum_versions.java_vm, "1.6.0_29");
        assert_eq!(config.minimum_versions.chrome, "38");
        assert_eq!(config.minimum_versions.outlook, "2003");
        assert!(!config.output.identify_unknown);
        assert!(!config.output.verbose);
        assert!(config.agents.unsupported_signatures.is_empty());
        assert!(config.agents.supported_signatures.contains(&"S3_Console".to_string()));
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanner.yaml");
        let path = path.to_str().unwrap();

        let mut config = ScannerConfig::default();
        config.output.identify_unknown = true;
        config.minimum_versions.chrome = "40".to_string();
        config.agents.unsupported_signatures.push("Boto".to_string());
        config.to_file(path).unwrap();

        let loaded = ScannerConfig::from_file(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = "output:\n  verbose: true\nminimum_versions:\n  firefox: \"3.0\"\n";
        let config: ScannerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.output.verbose);
        assert!(!config.output.identify_unknown);
        assert_eq!(config.minimum_versions.firefox, "3.0");
        assert_eq!(config.minimum_versions.safari, "3");
        assert_eq!(config.agents, AgentLists::default());
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = ScannerConfig::from_file("/nonexistent/scanner.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scanner.yaml"));
    }
}
