use crate::config::OutputConfig;
use crate::verdict::SupportVerdict;

/// Label as it appears in a result line.
pub fn render_label(label: &str) -> String {
    label.replace(' ', "_")
}

/// Render `<code> [<T|F> ]<label>[ [<raw_input>]]`.
pub fn format_result(
    verdict: SupportVerdict,
    identified: bool,
    label: &str,
    raw_input: &str,
    output: &OutputConfig,
) -> String {
    let flag = match (output.identify_unknown, identified) {
        (false, _) => "",
        (true, true) => "T ",
        (true, false) => "F ",
    };
    let label = render_label(label);

    if output.verbose {
        format!("{} {flag}{label} [{raw_input}]", verdict.code())
    } else {
        format!("{} {flag}{label}", verdict.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(identify_unknown: bool, verbose: bool) -> OutputConfig {
        OutputConfig {
            identify_unknown,
            verbose,
        }
    }

    #[test]
    fn test_plain_line() {
        let line = format_result(
            SupportVerdict::Supported,
            true,
            "Mobile Safari",
            "ignored",
            &output(false, false),
        );
        assert_eq!(line, "0 Mobile_Safari");
    }

    #[test]
    fn test_identify_unknown_flag() {
        let out = output(true, false);
        assert_eq!(
            format_result(SupportVerdict::Unknown, true, "Boto3", "", &out),
            "1 T Boto3"
        );
        assert_eq!(
            format_result(SupportVerdict::NotSupported, false, "Other", "", &out),
            "2 F Other"
        );
    }

    #[test]
    fn test_verbose_appends_raw_input() {
        let line = format_result(
            SupportVerdict::Unknown,
            false,
            "Other",
            "curl/7.38.0",
            &output(true, true),
        );
        assert_eq!(line, "1 F Other [curl/7.38.0]");

        let line = format_result(SupportVerdict::Unknown, true, "Empty_UserAgent", "", &output(false, true));
        assert_eq!(line, "1 Empty_UserAgent []");
    }
}
