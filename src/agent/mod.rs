pub mod builtin;

pub use builtin::BuiltinAgentParser;

use serde::Serialize;

/// Browser and OS identity of a UA string as reported by a generic parser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub browser_family: String,
    pub browser_version: String,
    pub os_family: String,
    pub os_version: String,
}

impl AgentProfile {
    /// Split composite OS families such as `Windows 8.1` or
    /// `Windows Phone 8` into family and version.
    pub fn normalized(mut self) -> Self {
        let family = self.os_family.as_str();

        if family.contains("Windows") && family != "Windows" && !family.contains("Windows Phone") {
            if let Some((name, version)) = family.split_once(' ') {
                self.os_version = version.to_string();
                self.os_family = name.to_string();
            }
        } else if family.contains("Windows Phone") {
            let parts: Vec<&str> = family.splitn(3, ' ').collect();
            if let Some(version) = parts.get(2) {
                self.os_version = version.to_string();
            }
            if parts.len() >= 2 {
                self.os_family = parts[0].to_string();
            }
        }

        self
    }

    /// Everything before the first `.` of the OS version.
    pub fn os_major_version(&self) -> &str {
        major_version(&self.os_version)
    }
}

pub fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Generic browser/OS detection for UA strings no signature recognizes.
///
/// Implementations report families using the community ua-parser names
/// (`Firefox`, `Mobile Safari`, `Mac OS X`, ...) and `Other` for anything
/// they cannot place. The profile is returned as parsed; callers apply
/// [`AgentProfile::normalized`].
pub trait AgentParser: Send + Sync {
    fn parse(&self, ua: &str) -> AgentProfile;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_os(family: &str, version: &str) -> AgentProfile {
        AgentProfile {
            os_family: family.to_string(),
            os_version: version.to_string(),
            ..Default::default()
        }
        .normalized()
    }

    #[test]
    fn test_composite_windows_family_split() {
        let profile = with_os("Windows 8.1", "");
        assert_eq!(profile.os_family, "Windows");
        assert_eq!(profile.os_version, "8.1");
        assert_eq!(profile.os_major_version(), "8");

        let profile = with_os("Windows XP", "");
        assert_eq!(profile.os_family, "Windows");
        assert_eq!(profile.os_version, "XP");

        let profile = with_os("Windows NT 4.0", "");
        assert_eq!(profile.os_family, "Windows");
        assert_eq!(profile.os_version, "NT 4.0");
    }

    #[test]
    fn test_plain_windows_untouched() {
        let profile = with_os("Windows", "6.3");
        assert_eq!(profile.os_family, "Windows");
        assert_eq!(profile.os_version, "6.3");
        assert_eq!(profile.os_major_version(), "6");
    }

    #[test]
    fn test_windows_phone_split() {
        let profile = with_os("Windows Phone 8", "");
        assert_eq!(profile.os_family, "Windows");
        assert_eq!(profile.os_version, "8");

        let profile = with_os("Windows Phone", "7.5");
        assert_eq!(profile.os_family, "Windows");
        assert_eq!(profile.os_version, "7.5");
    }

    #[test]
    fn test_other_families_untouched() {
        let profile = with_os("Mac OS X", "10.9.5");
        assert_eq!(profile.os_family, "Mac OS X");
        assert_eq!(profile.os_major_version(), "10");
    }

    #[test]
    fn test_major_version() {
        assert_eq!(major_version("10.9.5"), "10");
        assert_eq!(major_version("Vista"), "Vista");
        assert_eq!(major_version(""), "");
        assert_eq!(major_version(".5"), "");
    }
}
