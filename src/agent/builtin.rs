use super::{AgentParser, AgentProfile};
use anyhow::Context;
use regex::{Captures, Regex};

/// Family reported when no rule matches.
pub const OTHER_FAMILY: &str = "Other";

struct AgentRule {
    family: &'static str,
    pattern: Regex,
}

impl AgentRule {
    /// Capture groups 1 to 3 are major, minor and patch; the version is
    /// whichever of them took part, joined with `.`.
    fn version(caps: &Captures<'_>) -> String {
        (1..=3)
            .filter_map(|i| caps.get(i))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(".")
    }
}

fn compile(rules: &[(&'static str, &str)]) -> anyhow::Result<Vec<AgentRule>> {
    rules
        .iter()
        .map(|&(family, pattern)| -> anyhow::Result<AgentRule> {
            Ok(AgentRule {
                family,
                pattern: Regex::new(pattern)
                    .with_context(|| format!("invalid agent rule for '{family}'"))?,
            })
        })
        .collect()
}

fn first_match(rules: &[AgentRule], ua: &str) -> (String, String) {
    rules
        .iter()
        .find_map(|rule| {
            rule.pattern
                .captures(ua)
                .map(|caps| (rule.family.to_string(), AgentRule::version(&caps)))
        })
        .unwrap_or_else(|| (OTHER_FAMILY.to_string(), String::new()))
}

/// Compact regex-table parser using ua-parser family names.
///
/// It covers the browser and OS families the support rules care about; it is
/// not meant to identify every client in the wild.
pub struct BuiltinAgentParser {
    browsers: Vec<AgentRule>,
    oses: Vec<AgentRule>,
}

impl BuiltinAgentParser {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            browsers: compile(BROWSER_RULES)?,
            oses: compile(OS_RULES)?,
        })
    }
}

impl AgentParser for BuiltinAgentParser {
    fn parse(&self, ua: &str) -> AgentProfile {
        let (browser_family, browser_version) = first_match(&self.browsers, ua);
        let (os_family, os_version) = first_match(&self.oses, ua);

        AgentProfile {
            browser_family,
            browser_version,
            os_family,
            os_version,
        }
    }
}

// Order matters: embedding engines (Edge, Silk, Opera over Chrome; Chrome
// over Safari; Firefox forks over Firefox) must come first.
const BROWSER_RULES: &[(&str, &str)] = &[
    ("Googlebot", r"Googlebot(?:-Mobile)?/(\d+)\.(\d+)"),
    ("bingbot", r"bingbot/(\d+)\.(\d+)"),
    ("Slurp", r"(?:Yahoo! )?Slurp(?:/(\d+)\.(\d+))?"),
    ("LinkedInBot", r"LinkedInBot/(\d+)\.(\d+)"),
    ("TwitterBot", r"Twitterbot/(\d+)\.(\d+)"),
    ("FacebookBot", r"facebookexternalhit/(\d+)\.(\d+)"),
    (
        "Outlook",
        r"Microsoft Outlook(?: (\d+)\.(\d+)(?:\.(\d+))?)?",
    ),
    ("Lightning", r"Lightning/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Thunderbird", r"Thunderbird/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("SeaMonkey", r"SeaMonkey/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Netscape", r"Netscape\d?/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Edge", r"\bEdge?/(\d+)(?:\.(\d+))?"),
    ("Silk", r"Silk/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Opera", r"OPR/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Opera Mini", r"Opera Mini/(\d+)\.(\d+)"),
    ("Opera", r"Opera/.+Version/(\d+)\.(\d+)"),
    ("Opera", r"Opera[ /](\d+)\.(\d+)"),
    ("Konqueror", r"Konqueror/(\d+)(?:\.(\d+))?(?:\.(\d+))?"),
    ("Comodo Dragon", r"Comodo_Dragon/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Iron", r"\bIron/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Chromium", r"Chromium/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Chrome Mobile iOS", r"CriOS/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Firefox iOS", r"FxiOS/(\d+)\.(\d+)"),
    (
        "Chrome Mobile",
        r"Chrome/(\d+)\.(\d+)(?:\.(\d+))?(?:\.\d+)? Mobile",
    ),
    ("Chrome", r"Chrome/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Iceweasel", r"Iceweasel/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Swiftfox", r"Swiftfox/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Swiftweasel", r"Swiftweasel/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Waterfox", r"Waterfox/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("TenFourFox", r"TenFourFox/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Firefox Mobile", r"(?:Mobile|Tablet);.*Firefox/(\d+)\.(\d+)"),
    ("Firefox Beta", r"Firefox/(\d+)\.(\d+)b\d*"),
    ("Firefox Alpha", r"Firefox/(\d+)\.(\d+)a\d*"),
    ("Firefox", r"Firefox/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("IE Mobile", r"IEMobile[ /](\d+)\.(\d+)"),
    ("IE", r"MSIE (\d+)\.(\d+)"),
    ("IE", r"Trident/7\.0.*rv:(\d+)\.(\d+)"),
    ("CFNetwork", r"CFNetwork/(\d+)(?:\.(\d+))?(?:\.(\d+))?"),
    ("BlackBerry WebKit", r"BB10;.*Version/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("BlackBerry", r"BlackBerry ?(\d+)"),
    (
        "Android",
        r"Android.*Version/(\d+)\.(\d+)(?:\.(\d+))?(?: Mobile)? Safari",
    ),
    (
        "Mobile Safari",
        r"Version/(\d+)\.(\d+)(?:\.(\d+))?.*Mobile.*Safari/",
    ),
    ("Safari", r"Version/(\d+)\.(\d+)(?:\.(\d+))?.*Safari/"),
];

// `Windows NT x.y` reports the kernel version as-is; legacy releases report
// composite families the profile normalization splits.
const OS_RULES: &[(&str, &str)] = &[
    ("Windows Phone", r"Windows Phone(?: OS)? (\d+)\.(\d+)"),
    ("Windows", r"Windows NT (\d+)\.(\d+)"),
    ("Windows 98", r"Win(?:dows )?98"),
    ("Windows 95", r"Win(?:dows )?95"),
    ("Windows ME", r"Win 9x 4\.90|Windows ME"),
    ("Windows CE", r"Windows CE"),
    ("Windows 3.1", r"Windows 3\.1|Win16"),
    ("Windows XP", r"Windows XP"),
    ("Windows Vista", r"Windows Vista"),
    ("Windows RT", r"Windows RT"),
    ("Windows", r"Windows"),
    ("iOS", r"(?:CPU OS|iPhone OS|CPU iPhone OS) (\d+)_(\d+)(?:_(\d+))?"),
    ("iOS", r"\b(?:iPhone|iPad|iPod)\b"),
    ("Chrome OS", r"CrOS \S+ (\d+)\.(\d+)(?:\.(\d+))?"),
    ("Chrome OS", r"CrOS"),
    ("Mac OS X", r"Mac OS X (\d+)[_.](\d+)(?:[_.](\d+))?"),
    ("Mac OS X", r"Mac OS X|Macintosh"),
    ("Android", r"Android[ /-]?(\d+)(?:\.(\d+))?(?:\.(\d+))?"),
    ("Android", r"Android"),
    ("BlackBerry Tablet OS", r"RIM Tablet OS (\d+)\.(\d+)(?:\.(\d+))?"),
    ("BlackBerry OS", r"BlackBerry ?\d+/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("BlackBerry OS", r"BB10;.*Version/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("webOS", r"(?:web|hpw)OS/(\d+)\.(\d+)(?:\.(\d+))?"),
    ("Symbian", r"Symbian(?:OS)?/(\d+)\.(\d+)|SymbOS"),
    ("Linux", r"Linux"),
];
