//! Known-application signatures.
//!
//! These cover clients the generic parser knows nothing about: AWS SDKs and
//! tools, CDNs, and a handful of crawlers and desktop clients. Each pattern
//! names its capture groups after a [`SignatureField`], so the extracted
//! values are addressed by meaning rather than by position.

use anyhow::Context;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Normalized strings treated as "no User-Agent at all".
pub const NULL_AGENTS: &[&str] = &["", "null", "(null)", "[null]", "{null}"];

/// Semantic meaning of a capture group in a signature pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureField {
    Sdk,
    SdkVersion,
    SdkDetail,
    Vm,
    VmVersion,
    Os,
    OsVersion,
    JavaVm,
    JavaVmVersion,
    JavaVersion,
    Lang,
    Region,
    App,
    AppVersion,
    Application,
    Version,
    Platform,
    PlatformVersion,
    FrameworkVersion,
    Guid,
    Kind,
    Company,
    Group,
    Arch,
}

impl SignatureField {
    pub const ALL: &'static [SignatureField] = &[
        SignatureField::Sdk,
        SignatureField::SdkVersion,
        SignatureField::SdkDetail,
        SignatureField::Vm,
        SignatureField::VmVersion,
        SignatureField::Os,
        SignatureField::OsVersion,
        SignatureField::JavaVm,
        SignatureField::JavaVmVersion,
        SignatureField::JavaVersion,
        SignatureField::Lang,
        SignatureField::Region,
        SignatureField::App,
        SignatureField::AppVersion,
        SignatureField::Application,
        SignatureField::Version,
        SignatureField::Platform,
        SignatureField::PlatformVersion,
        SignatureField::FrameworkVersion,
        SignatureField::Guid,
        SignatureField::Kind,
        SignatureField::Company,
        SignatureField::Group,
        SignatureField::Arch,
    ];

    /// Capture group name used for this field inside signature patterns.
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureField::Sdk => "sdk",
            SignatureField::SdkVersion => "sdk_version",
            SignatureField::SdkDetail => "sdk_detail",
            SignatureField::Vm => "vm",
            SignatureField::VmVersion => "vm_version",
            SignatureField::Os => "os",
            SignatureField::OsVersion => "os_version",
            SignatureField::JavaVm => "java_vm",
            SignatureField::JavaVmVersion => "java_vm_version",
            SignatureField::JavaVersion => "java_version",
            SignatureField::Lang => "lang",
            SignatureField::Region => "region",
            SignatureField::App => "app",
            SignatureField::AppVersion => "app_version",
            SignatureField::Application => "application",
            SignatureField::Version => "version",
            SignatureField::Platform => "platform",
            SignatureField::PlatformVersion => "platform_version",
            SignatureField::FrameworkVersion => "framework_version",
            SignatureField::Guid => "guid",
            SignatureField::Kind => "kind",
            SignatureField::Company => "company",
            SignatureField::Group => "group",
            SignatureField::Arch => "arch",
        }
    }
}

impl fmt::Display for SignatureField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignatureField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown signature field '{s}'"))
    }
}

/// One known client: a name, a pattern, and the fields it captures.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: &'static str,
    pub pattern: Regex,
    fields: Vec<(SignatureField, usize)>,
}

impl Signature {
    /// Compile a signature. Every capture group must be named after a
    /// [`SignatureField`]; use `(?:...)` for grouping without capture.
    pub fn new(name: &'static str, pattern: &str) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("invalid pattern for signature '{name}'"))?;

        let mut fields = Vec::new();
        // Group 0 is the whole match and is never named.
        for (index, group) in pattern.capture_names().enumerate().skip(1) {
            let group = group.with_context(|| {
                format!("signature '{name}' has unnamed capture group {index}")
            })?;
            let field = group
                .parse::<SignatureField>()
                .with_context(|| format!("signature '{name}'"))?;
            fields.push((field, index));
        }

        Ok(Self {
            name,
            pattern,
            fields,
        })
    }

    pub fn has_field(&self, field: SignatureField) -> bool {
        self.group_index(field).is_some()
    }

    fn group_index(&self, field: SignatureField) -> Option<usize> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, index)| *index)
    }
}

/// Outcome of running a UA string through the [`SignatureSet`].
#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    pub signature: Option<&'a Signature>,
    /// Capture groups of the winning pattern, group 0 included.
    pub captures: Vec<Option<String>>,
    /// The URL-decoded input.
    pub decoded: String,
}

impl<'a> MatchResult<'a> {
    fn unmatched(decoded: String) -> Self {
        Self {
            signature: None,
            captures: Vec::new(),
            decoded,
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        self.signature.map(|s| s.name)
    }

    /// Value captured for `field`, if the signature has it and it took part
    /// in the match.
    pub fn field(&self, field: SignatureField) -> Option<&str> {
        let index = self.signature?.group_index(field)?;
        self.captures.get(index)?.as_deref()
    }
}

/// `+` to space, then percent-decoding. Invalid UTF-8 is replaced.
pub fn decode_agent(ua: &str) -> String {
    let plus_decoded = ua.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Lower-cased copy of `ua` with all whitespace and `+` removed.
pub fn normalize_agent(ua: &str) -> String {
    ua.chars()
        .filter(|c| !c.is_whitespace() && *c != '+')
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_null_agent(ua: &str) -> bool {
    let normalized = normalize_agent(ua);
    NULL_AGENTS.contains(&normalized.as_str())
}

/// Ordered signature list. The first matching signature wins, so more
/// specific patterns must come before more general ones.
#[derive(Debug, Clone)]
pub struct SignatureSet {
    signatures: Vec<Signature>,
}

impl SignatureSet {
    pub fn new(signatures: Vec<Signature>) -> Self {
        Self { signatures }
    }

    pub fn builtin() -> anyhow::Result<Self> {
        let signatures = BUILTIN_SIGNATURES
            .iter()
            .map(|&(name, pattern)| Signature::new(name, pattern))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(signatures))
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    /// Decode `ua` and find the first signature matching it. Null agents are
    /// never matched against the list.
    pub fn match_agent(&self, ua: &str) -> MatchResult<'_> {
        let decoded = decode_agent(ua);
        if is_null_agent(&decoded) {
            return MatchResult::unmatched(decoded);
        }

        for signature in &self.signatures {
            if let Some(caps) = signature.pattern.captures(&decoded) {
                let captures = caps
                    .iter()
                    .map(|group| group.map(|m| m.as_str().to_string()))
                    .collect();
                log::debug!("UA matched signature {}", signature.name);
                return MatchResult {
                    signature: Some(signature),
                    captures,
                    decoded,
                };
            }
        }

        MatchResult::unmatched(decoded)
    }
}

macro_rules! dotnet_signature {
    ($name:literal) => {
        (
            $name,
            concat!(
                r"^.*?(?P<application>",
                $name,
                r")/(?P<version>.*?)",
                r"\s+\.NET\s+(?P<platform>.*?)/(?P<platform_version>.*?)\s+\.NET\s+Framework/(?P<framework_version>.*?)\s+OS/(?P<os_version>.*?)\s+.*?$"
            ),
        )
    };
}

static BUILTIN_SIGNATURES: &[(&str, &str)] = &[
    // AWS SDKs
    (
        "Boto3",
        r"^.*(?P<sdk>Boto3)/(?P<sdk_version>.*)\s+(?P<vm>.*)/(?P<vm_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)$",
    ),
    (
        "Boto",
        r"^.*(?P<sdk>Boto)/(?P<sdk_version>.*)\s+(?P<vm>.*)/(?P<vm_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)$",
    ),
    (
        "aws-sdk-android",
        r"^.*(?P<sdk>aws-sdk-android)/(?P<sdk_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)\s+(?P<java_vm>.*)/(?P<java_vm_version>.*)/(?P<java_version>\w*)(?:\s(?P<lang>[a-zA-Z]+)(?:_(?P<region>[a-zA-Z]+))?)?.*$",
    ),
    (
        "aws-sdk-android",
        r"^.*(?P<sdk>aws-sdk-android)/(?P<sdk_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)\s+(?P<java_vm>.*)/(?P<java_vm_version>.*)\s+(?P<lang>.*).*$",
    ),
    (
        "aws-sdk-java",
        r"^.*(?P<sdk>aws-sdk-java)/(?P<sdk_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)\s+(?P<java_vm>.*)/(?P<java_vm_version>.*)/(?P<java_version>.*)\s+(?P<app>.*)/(?P<app_version>.*).*$",
    ),
    (
        "aws-sdk-java",
        r"^.*(?P<sdk>aws-sdk-java)/(?P<sdk_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)\s+(?P<java_vm>.*)/(?P<java_vm_version>.*)/(?P<java_version>.*)?.*$",
    ),
    (
        "aws-sdk-java",
        r"^.*(?P<sdk>aws-sdk-java)/(?P<sdk_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)\s+(?P<java_vm>.*)/(?P<java_vm_version>.*).*$",
    ),
    (
        "aws-sdk-iOS",
        r"^.*(?P<sdk>aws-sdk-iOS)/(?P<sdk_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)\s+(?P<lang>.*?)[_\s\{0,1\}].*?(?P<region>.*?)$",
    ),
    (
        "aws-sdk-iOS",
        r"^.*(?P<sdk>aws-sdk-iOS)/(?P<sdk_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)$",
    ),
    (
        "aws-sdk-ruby2",
        r"^.*?(?P<application>aws-sdk-ruby2)/(?P<version>.*?)\s+(?:.*?)/(?:.*?).*?$",
    ),
    (
        "aws-sdk-ruby",
        r"^.*?(?P<application>aws-sdk-ruby)/(?P<version>.*?)\s+(?:.*)/(?:.*?)\s+(?:.*).*?$",
    ),
    dotnet_signature!("aws-sdk-dotnet-ios"),
    dotnet_signature!("aws-sdk-dotnet-35"),
    dotnet_signature!("aws-sdk-dotnet-45"),
    dotnet_signature!("aws-sdk-dotnet"),
    ("aws-sdk-js", r"^.*(?P<sdk>aws-sdk-js)/(?P<sdk_version>.*)$"),
    ("aws-sdk-go", r"^.*(?P<sdk>aws-sdk-go)/(?P<sdk_version>.*)$"),
    (
        "aws-sdk-php",
        r"^.*?(?P<sdk>aws-sdk-php)/(?P<sdk_version>.*?)\s+(?P<sdk_detail>.*).*?$",
    ),
    (
        "aws-sdk-php2",
        r"^.*?(?P<sdk>aws-sdk-php2)/(?P<sdk_version>.*?)\s+(?P<sdk_detail>.*).*?$",
    ),
    (
        "aws-sdk-nodejs",
        r"^.*(?P<sdk>aws-sdk-nodejs)/(?P<sdk_version>.*)\s+(?P<platform>.*)/(?P<platform_version>.*)$",
    ),
    // AWS applications and services
    (
        "aws-internal",
        r"^(?P<guid>.*)(?P<sdk>aws-internal)/(?P<sdk_version>.*).*?$",
    ),
    (
        "AWS_CLI",
        r"^.*(?P<sdk>aws-cli)/(?P<sdk_version>.*)\s+(?P<vm>.*)/(?P<vm_version>.*)\s+(?P<os>.*)/(?P<os_version>.*)$",
    ),
    (
        "S3_Console",
        r"^.*(?P<application>S3Console)/(?P<version>.*).*$",
    ),
    ("ElasticBeanstalk", r"^(?P<application>ElasticBeanstalk)-.*$"),
    (
        "S3_Browser",
        r"^.*(?P<application>S3 Browser)\s+(?P<version>.*)\s+.*$",
    ),
    (
        "AWSToolkitPackage",
        r"^.*?(?P<application>AWSToolkitPackage)\.(?P<app>.*?)/(?P<app_version>.*?)\s+\.NET\s+(?P<platform>.*?)/(?P<platform_version>.*?)\s+\.NET\s+Framework/(?P<framework_version>.*?)\s+OS/(?P<os_version>.*?)\s+.*?$",
    ),
    // CDNs
    (
        "Akamai_Edge",
        r"^(?P<kind>.*)(?P<company>Akamai) (?P<group>Edge).*$",
    ),
    (
        "Amazon_CloudFront",
        r"^(?P<kind>.*)(?P<company>Amazon) (?P<group>CloudFront).*$",
    ),
    // Bots
    (
        "image_coccoc",
        r"^.*?(?P<application>image.coccoc)/(?P<version>.*?);.*?$",
    ),
    (
        "CloudFlare_AlwaysOnline",
        r"^.*(?P<application>CloudFlare-AlwaysOnline)/(?P<version>.*);.*$",
    ),
    (
        "Google_ImageBot",
        r"^.*(?P<application>Googlebot-Image)/(?P<version>.*).*$",
    ),
    (
        "Google_ADsBot",
        r"^.*(?P<application>AdsBot-Google)\s+(?P<version>\(.*\)).*$",
    ),
    (
        "MSNBot_Media",
        r"^.*?(?P<application>msnbot-media)/(?P<version>.*?)\s+(?:.*?)$",
    ),
    (
        "Exabot",
        r"^.*?(?P<application>Exabot)/(?P<version>.*?)\s+(?:.*?)$",
    ),
    (
        "Facebook_Platform",
        r"^.*(?P<application>facebookplatform)/(?P<version>.*)\s+.*$",
    ),
    // https://api.slack.com/robots
    (
        "Slackbot_LinkExpanding",
        r"^.*?(?P<application>Slackbot-LinkExpanding) (?P<version>.*?)\s+(?:.*?)$",
    ),
    (
        "Slack_ImgProxy",
        r"^.*?(?P<application>Slack-ImgProxy) (?P<version>.*?)\s+(?:.*?)$",
    ),
    (
        "Slackbot",
        r"^.*?(?P<application>Slackbot) (?P<version>.*?)\((?:.*?)\)$",
    ),
    // Client applications
    (
        "CloudBerry_Client",
        r"^.*?(?P<application>CloudBerryLab\.Base\.HttpUtil\.Client)\s+(?P<version>.*?)\s+(?:\(.*?\)).*?$",
    ),
    (
        "JetS3t",
        r"^.*(?P<application>JetS3t)/(?P<version>.*)\s+\((?P<os>.*)/(?P<os_version>.*);\s+(?P<arch>.*);\s+(?P<lang>.*);\s+(?P<java_vm>.*)\s+(?P<java_vm_version>.*)\).*$",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> SignatureSet {
        SignatureSet::builtin().unwrap()
    }

    #[test]
    fn test_builtin_signatures_compile() {
        let set = set();
        assert_eq!(set.len(), BUILTIN_SIGNATURES.len());
        assert!(set
            .iter()
            .all(|s| SignatureField::ALL.iter().any(|&f| s.has_field(f))));
    }

    #[test]
    fn test_unnamed_group_rejected() {
        assert!(Signature::new("bad", r"^(foo)/(?P<version>.*)$").is_err());
        assert!(Signature::new("bad", r"^(?P<nonsense>foo)$").is_err());
        assert!(Signature::new("bad", r"^(?P<version>foo").is_err());
    }

    #[test]
    fn test_decode_agent() {
        assert_eq!(decode_agent("aws-cli/1.7.12+Python/2.7.9"), "aws-cli/1.7.12 Python/2.7.9");
        assert_eq!(decode_agent("Mozilla%2F5.0%20(X11)"), "Mozilla/5.0 (X11)");
        assert_eq!(decode_agent("100%"), "100%");
        assert_eq!(decode_agent("%FF"), "\u{FFFD}");
    }

    #[test]
    fn test_null_agents() {
        for ua in ["", "null", "NULL", " (null) ", "[Null]", "{ null }", "\t"] {
            assert!(is_null_agent(ua), "{ua:?}");
        }
        assert!(!is_null_agent("nullable"));
        assert!(is_null_agent("null+"));
        assert!(set().match_agent("%28null%29").signature.is_none());
    }

    #[test]
    fn test_boto3_precedence() {
        let set = set();
        let result = set.match_agent("Boto3/1.2 Python/2.7 Linux/4.4");
        assert_eq!(result.name(), Some("Boto3"));
        assert_eq!(result.field(SignatureField::SdkVersion), Some("1.2"));
        assert_eq!(result.field(SignatureField::Vm), Some("Python"));
        assert_eq!(result.field(SignatureField::OsVersion), Some("4.4"));

        let result = set.match_agent("Boto/2.38.0 Python/2.7.9 Linux/3.14.48");
        assert_eq!(result.name(), Some("Boto"));
    }

    #[test]
    fn test_aws_sdk_java_fields() {
        let set = set();
        let result = set.match_agent(
            "aws-sdk-java/1.10.20 Linux/3.14.48 Java_HotSpot(TM)_64-Bit_Server_VM/25.51-b03/1.8.0_51",
        );
        assert_eq!(result.name(), Some("aws-sdk-java"));
        assert_eq!(result.field(SignatureField::Os), Some("Linux"));
        assert_eq!(
            result.field(SignatureField::JavaVm),
            Some("Java_HotSpot(TM)_64-Bit_Server_VM")
        );
        assert_eq!(result.field(SignatureField::JavaVmVersion), Some("25.51-b03"));
        assert_eq!(result.field(SignatureField::JavaVersion), Some("1.8.0_51"));
        assert_eq!(result.field(SignatureField::App), None);
    }

    #[test]
    fn test_aws_sdk_java_with_app_suffix() {
        let set = set();
        let result = set.match_agent(
            "aws-sdk-java/1.9.6 Linux/2.6.32 OpenJDK_64-Bit_Server_VM/24.65-b04/1.7.0_71 myapp/2.1",
        );
        assert_eq!(result.name(), Some("aws-sdk-java"));
        assert_eq!(result.field(SignatureField::JavaVm), Some("OpenJDK_64-Bit_Server_VM"));
        assert_eq!(result.field(SignatureField::JavaVersion), Some("1.7.0_71"));
        assert_eq!(result.field(SignatureField::App), Some("myapp"));
        assert_eq!(result.field(SignatureField::AppVersion), Some("2.1"));
    }

    #[test]
    fn test_aws_sdk_ios_fields() {
        let set = set();
        let result = set.match_agent("aws-sdk-iOS/2.0.17 iPhone-OS/8.1 en_US");
        assert_eq!(result.name(), Some("aws-sdk-iOS"));
        assert_eq!(result.field(SignatureField::Os), Some("iPhone-OS"));
        assert_eq!(result.field(SignatureField::OsVersion), Some("8.1"));
        assert_eq!(result.field(SignatureField::Lang), Some("en"));
    }

    #[test]
    fn test_service_and_bot_signatures() {
        let set = set();
        let cases = [
            ("aws-cli/1.7.12 Python/2.7.9 Darwin/14.1.0", "AWS_CLI"),
            ("aws-sdk-js/2.1.10", "aws-sdk-js"),
            ("aws-sdk-go/0.9.9", "aws-sdk-go"),
            ("aws-sdk-nodejs/2.1.18 linux/v0.12.0", "aws-sdk-nodejs"),
            ("aws-sdk-php2/2.7.20 Guzzle/3.9.3 curl/7.38.0 PHP/5.5.9", "aws-sdk-php2"),
            ("aws-sdk-ruby2/2.0.30 ruby/2.1.5 x86_64-linux", "aws-sdk-ruby2"),
            ("S3Console/0.4", "S3_Console"),
            ("ElasticBeanstalk-Java", "ElasticBeanstalk"),
            ("Amazon CloudFront", "Amazon_CloudFront"),
            ("Mozilla/5.0 (compatible; Googlebot-Image/1.0)", "Google_ImageBot"),
            ("AdsBot-Google (+http://www.google.com/adsbot.html)", "Google_ADsBot"),
            (
                "Slackbot-LinkExpanding 1.0 (+https://api.slack.com/robots)",
                "Slackbot_LinkExpanding",
            ),
            ("Slackbot 1.0 (+https://api.slack.com/robots)", "Slackbot"),
            (
                "JetS3t/0.9.0 (Linux/3.2.0; amd64; en; JVM 1.7.0_65)",
                "JetS3t",
            ),
        ];
        for (ua, expected) in cases {
            assert_eq!(set.match_agent(ua).name(), Some(expected), "{ua}");
        }
    }

    #[test]
    fn test_dotnet_fields() {
        let set = set();
        let result = set.match_agent(
            "aws-sdk-dotnet-45/2.3.8.1 .NET Runtime/4.0 .NET Framework/4.0 OS/6.2.9200.0 FileIO",
        );
        assert_eq!(result.name(), Some("aws-sdk-dotnet-45"));
        assert_eq!(result.field(SignatureField::Version), Some("2.3.8.1"));
        assert_eq!(result.field(SignatureField::FrameworkVersion), Some("4.0"));
        assert_eq!(result.field(SignatureField::OsVersion), Some("6.2.9200.0"));
    }

    #[test]
    fn test_browsers_fall_through() {
        let set = set();
        let result = set.match_agent(
            "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:40.0) Gecko/20100101 Firefox/40.1",
        );
        assert!(result.signature.is_none());
        assert!(result.field(SignatureField::Version).is_none());
    }
}
