//! Lowering, vendor prefixing and printing with `lightningcss`.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use super::StyleError;

/// Browser targets for a browserslist query list.
pub(crate) fn targets(queries: &[String]) -> Result<Targets, StyleError> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| StyleError::Css(format!("invalid browser query: {e}")))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// Parse, lower for `targets`, and print `css`.
pub(crate) fn print(
    css: &str,
    filename: &str,
    targets: Targets,
    minify: bool,
) -> Result<String, StyleError> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_owned(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| StyleError::Css(e.to_string()))?;

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| StyleError::Css(e.to_string()))?;

    let output = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| StyleError::Css(e.to_string()))?;

    Ok(output.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_targets() -> Targets {
        targets(&["defaults".to_owned()]).unwrap()
    }

    #[test]
    fn test_print_pretty_and_minified() {
        let css = ".a {\n  color: #ff0000;\n}\n\n.b {\n  margin: 0px 0px 0px 0px;\n}\n";

        let pretty = print(css, "index.css", default_targets(), false).unwrap();
        let minified = print(css, "index.css", default_targets(), true).unwrap();

        assert!(pretty.contains(".a {"));
        assert!(minified.len() <= pretty.len());
        assert!(!minified.contains('\n'));
        assert!(print(&minified, "index.css", default_targets(), false).is_ok());
    }

    #[test]
    fn test_old_targets_get_prefixes() {
        let old = targets(&["safari 8".to_owned()]).unwrap();

        let out = print(".a { user-select: none; }", "x.css", old, true).unwrap();

        assert!(out.contains("-webkit-user-select"));
    }

    #[test]
    fn test_invalid_selector_is_error() {
        let err = print("..a { color: red; }", "x.css", default_targets(), false).unwrap_err();

        assert!(matches!(err, StyleError::Css(_)));
    }

    #[test]
    fn test_invalid_browser_query() {
        assert!(targets(&["not a real browser 99".to_owned()]).is_err());
    }
}
