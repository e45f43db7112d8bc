use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA-256 certificate support verdict for a client.
///
/// This is three-valued logic, not a scale: there is no ordering between the
/// variants. `Unknown` is the neutral value and only moves through
/// [`SupportVerdict::combine`] or an explicit rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportVerdict {
    Supported,
    #[default]
    Unknown,
    NotSupported,
}

impl SupportVerdict {
    /// Output code used by the line format: 0, 1 or 2.
    pub fn code(self) -> u8 {
        match self {
            SupportVerdict::Supported => 0,
            SupportVerdict::Unknown => 1,
            SupportVerdict::NotSupported => 2,
        }
    }

    /// Merge an OS verdict and a browser verdict.
    ///
    /// Only agreement on `Supported` yields `Supported`; any `NotSupported`
    /// wins otherwise, and everything else stays `Unknown`.
    pub fn combine(os: SupportVerdict, browser: SupportVerdict) -> SupportVerdict {
        use SupportVerdict::*;

        match (os, browser) {
            (Supported, Supported) => Supported,
            (Unknown, Unknown) => Unknown,
            (os, browser) if os != NotSupported && browser != NotSupported => Unknown,
            _ => NotSupported,
        }
    }
}

impl fmt::Display for SupportVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::SupportVerdict::{self, *};

    #[test]
    fn test_combine_table() {
        assert_eq!(SupportVerdict::combine(Supported, Supported), Supported);
        assert_eq!(SupportVerdict::combine(Unknown, Unknown), Unknown);
        assert_eq!(SupportVerdict::combine(Supported, Unknown), Unknown);
        assert_eq!(SupportVerdict::combine(Unknown, Supported), Unknown);
        assert_eq!(SupportVerdict::combine(NotSupported, Unknown), NotSupported);
        assert_eq!(SupportVerdict::combine(Unknown, NotSupported), NotSupported);
        assert_eq!(SupportVerdict::combine(NotSupported, Supported), NotSupported);
        assert_eq!(SupportVerdict::combine(Supported, NotSupported), NotSupported);
        assert_eq!(
            SupportVerdict::combine(NotSupported, NotSupported),
            NotSupported
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(Supported.code(), 0);
        assert_eq!(Unknown.code(), 1);
        assert_eq!(NotSupported.code(), 2);
        assert_eq!(SupportVerdict::default(), Unknown);
        assert_eq!(NotSupported.to_string(), "2");
    }
}
