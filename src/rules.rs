//! Per-family support rules for UA strings resolved by the generic parser.

use crate::agent::AgentProfile;
use crate::config::ScannerConfig;
use crate::verdict::SupportVerdict;
use crate::version::compare_versions;
use std::collections::{HashMap, HashSet};

/// How an OS family's support is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsRule {
    /// Major version checked against the Windows allow and deny lists.
    WindowsRelease,
    /// OS version must be at least the given version.
    AtLeast(String),
    Fixed(SupportVerdict),
}

/// How a browser family's support is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserRule {
    /// The browser inherits the OS verdict.
    FollowsOs,
    /// Overall verdict is fixed regardless of the OS.
    Overall(SupportVerdict),
    /// Overall verdict is the browser version check alone.
    OverallAtLeast(String),
    /// Browser version must be at least the given version.
    AtLeast(String),
    /// OS version must be at least the given version.
    OsVersionAtLeast(String),
    /// Device model looked up in the BlackBerry model lists.
    BlackBerryModel,
    /// Recent releases carry their own TLS stack, older ones depend on the OS.
    ChromeRelease(String),
}

/// Verdicts produced for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleEvaluation {
    pub os: SupportVerdict,
    pub browser: SupportVerdict,
    pub overall: SupportVerdict,
    pub os_identified: bool,
    pub browser_identified: bool,
}

impl RuleEvaluation {
    pub fn identified(&self) -> bool {
        self.os_identified && self.browser_identified
    }
}

/// Dispatch tables keyed by family name, built once from the configuration.
#[derive(Debug, Clone)]
pub struct RuleSet {
    os_rules: HashMap<String, OsRule>,
    browser_rules: HashMap<String, BrowserRule>,
    windows_supported: HashSet<String>,
    windows_unsupported: HashSet<String>,
    blackberry_supported: HashSet<String>,
    blackberry_unsupported: HashSet<String>,
}

fn to_set(items: &[String]) -> HashSet<String> {
    items.iter().cloned().collect()
}

impl RuleSet {
    pub fn from_config(config: &ScannerConfig) -> Self {
        let mvr = &config.minimum_versions;
        let agents = &config.agents;

        let mut os_rules = HashMap::new();
        os_rules.insert("Windows".to_string(), OsRule::WindowsRelease);
        for (family, required) in [
            ("Windows Phone", &mvr.windows_phone),
            ("Mac OS X", &mvr.mac_os_x),
            ("iOS", &mvr.ios),
            ("Android", &mvr.android),
            ("BlackBerry OS", &mvr.blackberry_os),
            ("BlackBerry Tablet OS", &mvr.blackberry_tablet_os),
        ] {
            os_rules.insert(family.to_string(), OsRule::AtLeast(required.clone()));
        }
        os_rules.insert(
            "Chrome OS".to_string(),
            OsRule::Fixed(SupportVerdict::Supported),
        );
        os_rules.insert("webOS".to_string(), OsRule::Fixed(SupportVerdict::NotSupported));
        os_rules.insert(
            "Symbian".to_string(),
            OsRule::Fixed(SupportVerdict::NotSupported),
        );
        os_rules.insert("Linux".to_string(), OsRule::Fixed(SupportVerdict::Unknown));

        // Inserted in reverse precedence: a family named in several places
        // keeps the rule inserted last.
        let mut browser_rules = HashMap::new();
        for family in &agents.chrome_family {
            browser_rules.insert(family.clone(), BrowserRule::ChromeRelease(mvr.chrome.clone()));
        }
        for (family, rule) in [
            ("Android", BrowserRule::OsVersionAtLeast(mvr.android_browser.clone())),
            ("Outlook", BrowserRule::OsVersionAtLeast(mvr.outlook.clone())),
            ("Opera", BrowserRule::AtLeast(mvr.opera.clone())),
            ("Konqueror", BrowserRule::AtLeast(mvr.konqueror.clone())),
            ("Safari", BrowserRule::AtLeast(mvr.safari.clone())),
            ("Mobile Safari", BrowserRule::AtLeast(mvr.safari.clone())),
            ("IE", BrowserRule::AtLeast(mvr.ie.clone())),
            ("IE Mobile", BrowserRule::AtLeast(mvr.ie.clone())),
            ("BlackBerry", BrowserRule::BlackBerryModel),
            ("Thunderbird", BrowserRule::AtLeast(mvr.thunderbird.clone())),
        ] {
            browser_rules.insert(family.to_string(), rule);
        }
        for family in &agents.firefox_family {
            browser_rules.insert(family.clone(), BrowserRule::AtLeast(mvr.firefox.clone()));
        }
        for family in ["Edge", "CFNetwork"] {
            browser_rules.insert(family.to_string(), BrowserRule::FollowsOs);
        }
        browser_rules.insert(
            "Netscape".to_string(),
            BrowserRule::OverallAtLeast(mvr.netscape.clone()),
        );
        browser_rules.insert(
            "SeaMonkey".to_string(),
            BrowserRule::Overall(SupportVerdict::Supported),
        );
        for family in &agents.supported_bots {
            browser_rules.insert(family.clone(), BrowserRule::Overall(SupportVerdict::Supported));
        }
        for family in &agents.depends_on_os {
            browser_rules.insert(family.clone(), BrowserRule::FollowsOs);
        }

        RuleSet {
            os_rules,
            browser_rules,
            windows_supported: to_set(&agents.windows_supported),
            windows_unsupported: to_set(&agents.windows_unsupported),
            blackberry_supported: to_set(&agents.blackberry_supported_models),
            blackberry_unsupported: to_set(&agents.blackberry_unsupported_models),
        }
    }

    pub fn os_rule(&self, family: &str) -> Option<&OsRule> {
        self.os_rules.get(family)
    }

    pub fn browser_rule(&self, family: &str) -> Option<&BrowserRule> {
        self.browser_rules.get(family)
    }

    /// OS verdict and whether the family has a rule at all.
    pub fn os_verdict(&self, profile: &AgentProfile) -> (SupportVerdict, bool) {
        let Some(rule) = self.os_rule(&profile.os_family) else {
            return (SupportVerdict::Unknown, false);
        };

        let verdict = match rule {
            OsRule::WindowsRelease => {
                let major = profile.os_major_version();
                if self.windows_supported.contains(major) {
                    SupportVerdict::Supported
                } else if self.windows_unsupported.contains(major) {
                    SupportVerdict::NotSupported
                } else {
                    SupportVerdict::Unknown
                }
            }
            OsRule::AtLeast(required) => compare_versions(&profile.os_version, required),
            OsRule::Fixed(verdict) => *verdict,
        };

        (verdict, true)
    }

    /// Apply the OS rule, then the browser rule, then merge.
    ///
    /// `profile` must already be normalized.
    pub fn evaluate(&self, profile: &AgentProfile) -> RuleEvaluation {
        let (os, os_identified) = self.os_verdict(profile);

        let Some(rule) = self.browser_rule(&profile.browser_family) else {
            return RuleEvaluation {
                os,
                browser: SupportVerdict::Unknown,
                overall: SupportVerdict::combine(os, SupportVerdict::Unknown),
                os_identified,
                browser_identified: false,
            };
        };

        let (browser, overall) = match rule {
            BrowserRule::FollowsOs => (os, SupportVerdict::combine(os, os)),
            BrowserRule::Overall(verdict) => (*verdict, *verdict),
            BrowserRule::OverallAtLeast(required) => {
                let v = compare_versions(&profile.browser_version, required);
                (v, v)
            }
            BrowserRule::AtLeast(required) => {
                let v = compare_versions(&profile.browser_version, required);
                (v, SupportVerdict::combine(os, v))
            }
            BrowserRule::OsVersionAtLeast(required) => {
                let v = compare_versions(&profile.os_version, required);
                (v, SupportVerdict::combine(os, v))
            }
            BrowserRule::BlackBerryModel => {
                let v = if profile.os_family == "BlackBerry WebKit" {
                    os
                } else {
                    self.blackberry_model_verdict(&profile.browser_version)
                };
                (v, SupportVerdict::combine(os, v))
            }
            BrowserRule::ChromeRelease(required) => {
                let v = match compare_versions(&profile.browser_version, required) {
                    SupportVerdict::NotSupported => SupportVerdict::Unknown,
                    v => v,
                };
                (v, chrome_overall(os, v))
            }
        };

        RuleEvaluation {
            os,
            browser,
            overall,
            os_identified,
            browser_identified: true,
        }
    }

    fn blackberry_model_verdict(&self, model: &str) -> SupportVerdict {
        if self.blackberry_supported.contains(model) {
            SupportVerdict::Supported
        } else if self.blackberry_unsupported.contains(model) {
            SupportVerdict::NotSupported
        } else {
            SupportVerdict::Unknown
        }
    }
}

fn chrome_overall(os: SupportVerdict, browser: SupportVerdict) -> SupportVerdict {
    use SupportVerdict::*;

    match (browser, os) {
        (Supported, _) => Supported,
        (Unknown, Supported) => Supported,
        (Unknown, Unknown) => Unknown,
        _ => NotSupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::SupportVerdict::*;

    fn rules() -> RuleSet {
        RuleSet::from_config(&ScannerConfig::default())
    }

    fn profile(browser: &str, browser_version: &str, os: &str, os_version: &str) -> AgentProfile {
        AgentProfile {
            browser_family: browser.to_string(),
            browser_version: browser_version.to_string(),
            os_family: os.to_string(),
            os_version: os_version.to_string(),
        }
        .normalized()
    }

    #[test]
    fn test_windows_release_lists() {
        let rules = rules();
        assert_eq!(rules.os_verdict(&profile("IE", "9.0", "Windows 7", "")), (Supported, true));
        assert_eq!(rules.os_verdict(&profile("IE", "9.0", "Windows Vista", "")), (Supported, true));
        assert_eq!(rules.os_verdict(&profile("IE", "5.0", "Windows 98", "")), (NotSupported, true));
        assert_eq!(rules.os_verdict(&profile("IE", "6.0", "Windows XP", "")), (Unknown, true));
        assert_eq!(rules.os_verdict(&profile("IE", "6.0", "Windows", "6.3")), (Unknown, true));
        assert_eq!(rules.os_verdict(&profile("IE", "6.0", "Windows", "10.0")), (Supported, true));
    }

    #[test]
    fn test_os_rules() {
        let rules = rules();
        assert_eq!(rules.os_verdict(&profile("", "", "Mac OS X", "10.9.5")).0, Supported);
        assert_eq!(rules.os_verdict(&profile("", "", "Mac OS X", "10.4.11")).0, NotSupported);
        assert_eq!(rules.os_verdict(&profile("", "", "Android", "2.2.1")).0, NotSupported);
        assert_eq!(rules.os_verdict(&profile("", "", "iOS", "")).0, Unknown);
        assert_eq!(rules.os_verdict(&profile("", "", "Chrome OS", "")).0, Supported);
        assert_eq!(rules.os_verdict(&profile("", "", "Symbian", "9.2")).0, NotSupported);
        assert_eq!(rules.os_verdict(&profile("", "", "Linux", "")), (Unknown, true));
        assert_eq!(rules.os_verdict(&profile("", "", "Other", "")), (Unknown, false));
    }

    #[test]
    fn test_firefox_on_windows_81_is_unknown() {
        let eval = rules().evaluate(&profile("Firefox", "36.0", "Windows", "6.3"));
        assert_eq!(eval.os, Unknown);
        assert_eq!(eval.browser, Supported);
        assert_eq!(eval.overall, Unknown);
        assert!(eval.identified());
    }

    #[test]
    fn test_combined_browser_rules() {
        let rules = rules();
        let eval = rules.evaluate(&profile("Safari", "7.1", "Mac OS X", "10.9.5"));
        assert_eq!(eval.overall, Supported);

        let eval = rules.evaluate(&profile("IE", "5.5", "Windows 7", ""));
        assert_eq!(eval.browser, NotSupported);
        assert_eq!(eval.overall, NotSupported);

        let eval = rules.evaluate(&profile("Android", "4.0", "Android", "4.0.4"));
        assert_eq!(eval.overall, Supported);

        let eval = rules.evaluate(&profile("Konqueror", "3.5.5", "Linux", ""));
        assert_eq!(eval.overall, NotSupported);
    }

    #[test]
    fn test_fixed_overall_rules() {
        let rules = rules();
        let eval = rules.evaluate(&profile("Googlebot", "2.1", "Other", ""));
        assert_eq!(eval.overall, Supported);
        assert!(!eval.identified());

        let eval = rules.evaluate(&profile("SeaMonkey", "2.0", "Windows 98", ""));
        assert_eq!(eval.os, NotSupported);
        assert_eq!(eval.overall, Supported);

        let eval = rules.evaluate(&profile("Netscape", "7.0", "Windows 7", ""));
        assert_eq!(eval.overall, NotSupported);
    }

    #[test]
    fn test_follows_os() {
        let rules = rules();
        let eval = rules.evaluate(&profile("CFNetwork", "711.1", "iOS", "8.1"));
        assert_eq!(eval.browser, Supported);
        assert_eq!(eval.overall, Supported);

        let eval = rules.evaluate(&profile("Silk", "3.8", "Android", "2.2"));
        assert_eq!(eval.overall, NotSupported);

        let eval = rules.evaluate(&profile("Edge", "12.10240", "Windows", "10.0"));
        assert_eq!(eval.overall, Supported);
    }

    #[test]
    fn test_chrome_release() {
        let rules = rules();
        assert_eq!(
            rules.evaluate(&profile("Chrome", "37.0.2062", "Other", "")).overall,
            Unknown
        );
        assert_eq!(
            rules.evaluate(&profile("Chrome", "37.0.2062", "Mac OS X", "10.9.5")).overall,
            Supported
        );
        assert_eq!(
            rules.evaluate(&profile("Chrome", "37.0.2062", "Windows 98", "")).overall,
            NotSupported
        );
        // 38 and later are Supported whatever the OS verdict.
        assert_eq!(
            rules.evaluate(&profile("Chrome", "38.0.2125", "Windows 98", "")).overall,
            Supported
        );
    }

    #[test]
    fn test_blackberry_models() {
        let rules = rules();
        let eval = rules.evaluate(&profile("BlackBerry", "9700", "BlackBerry OS", "5.0.0"));
        assert_eq!(eval.browser, Supported);
        assert_eq!(eval.overall, Supported);

        let eval = rules.evaluate(&profile("BlackBerry", "8310", "BlackBerry OS", "4.5.0"));
        assert_eq!(eval.overall, NotSupported);

        let eval = rules.evaluate(&profile("BlackBerry", "1234", "BlackBerry OS", "5.0.0"));
        assert_eq!(eval.browser, Unknown);
        assert_eq!(eval.overall, Unknown);
    }

    #[test]
    fn test_unknown_browser_not_identified() {
        let eval = rules().evaluate(&profile("Other", "", "Windows 98", ""));
        assert!(!eval.browser_identified);
        assert!(eval.os_identified);
        assert_eq!(eval.overall, NotSupported);

        let eval = rules().evaluate(&profile("Lynx", "2.8", "Linux", ""));
        assert!(!eval.identified());
        assert_eq!(eval.overall, Unknown);
    }

    #[test]
    fn test_thresholds_follow_config() {
        let mut config = ScannerConfig::default();
        config.minimum_versions.firefox = "40".to_string();
        config.agents.depends_on_os.push("Opera".to_string());
        let rules = RuleSet::from_config(&config);

        assert_eq!(
            rules.browser_rule("Firefox"),
            Some(&BrowserRule::AtLeast("40".to_string()))
        );
        assert_eq!(rules.browser_rule("Opera"), Some(&BrowserRule::FollowsOs));
        let eval = rules.evaluate(&profile("Firefox", "36.0", "Mac OS X", "10.9"));
        assert_eq!(eval.overall, NotSupported);
    }
}
