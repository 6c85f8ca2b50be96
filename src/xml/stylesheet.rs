//! `<?xml-stylesheet ...?>` handling.

/// Target of the stylesheet association processing instruction.
pub const STYLESHEET_TARGET: &str = "xml-stylesheet";

/// Extract the transform reference from `xml-stylesheet` data.
///
/// Returns the `href` pseudo-attribute unless `type` names a non-XSL
/// stylesheet (e.g. `text/css`).
pub fn parse_stylesheet_href(data: &str) -> Option<String> {
    let attrs = pseudo_attributes(data);
    let lookup = |name: &str| {
        attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    };

    if let Some(kind) = lookup("type")
        && !kind.to_ascii_lowercase().contains("xsl")
    {
        return None;
    }

    lookup("href")
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

/// Split `name="value" name='value'` pairs. Malformed trailing input is ignored.
fn pseudo_attributes(data: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut rest = data.trim_start();

    while let Some(eq) = rest.find('=') {
        let name = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let Some(quote) = after.chars().next().filter(|c| matches!(c, '"' | '\'')) else {
            break;
        };
        let body = &after[1..];
        let Some(end) = body.find(quote) else {
            break;
        };
        out.push((name, &body[..end]));
        rest = body[end + 1..].trim_start();
    }

    out
}
