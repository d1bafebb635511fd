use regex::Regex;

/// Where an anti-forgery token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cookie,
    Explicit,
    FormField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub value: String,
    pub source: TokenSource,
}

/// Extract one value from a `Cookie` header string (`a=1; csrftoken=abc; b=2`).
pub fn parse_cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k.trim() != name {
            return None;
        }
        let v = v.trim().trim_matches('"');
        if v.is_empty() { None } else { Some(v.to_string()) }
    })
}

/// Value of `<input ... name="{field}" ... value="...">` in a saved form page.
/// Attribute order inside the tag is not fixed, so the tag is matched first.
pub fn parse_hidden_input(html: &str, field: &str) -> Option<String> {
    let tag_re = Regex::new(r#"(?is)<input\b[^>]*>"#).ok()?;
    let name_re = Regex::new(&format!(r#"(?i)\bname\s*=\s*["']{}["']"#, regex::escape(field))).ok()?;
    let value_re = Regex::new(r#"(?i)\bvalue\s*=\s*["']([^"']*)["']"#).ok()?;
    tag_re.find_iter(html).find_map(|tag| {
        let tag = tag.as_str();
        if !name_re.is_match(tag) {
            return None;
        }
        let v = value_re.captures(tag)?.get(1)?.as_str().trim();
        if v.is_empty() { None } else { Some(v.to_string()) }
    })
}

/// `action` attribute of the first `<form>` that carries one.
pub fn parse_form_action(html: &str) -> Option<String> {
    let form_re = Regex::new(r#"(?is)<form\b[^>]*\baction\s*=\s*["']([^"']+)["']"#).ok()?;
    let action = form_re.captures(html)?.get(1)?.as_str().trim();
    if action.is_empty() { None } else { Some(action.to_string()) }
}

/// Resolve a form action against an origin. Absolute URLs pass through.
pub fn resolve_action(action: &str, base_url: Option<&str>) -> Option<String> {
    if action.starts_with("http://") || action.starts_with("https://") {
        return Some(action.to_string());
    }
    let base = base_url?.trim_end_matches('/');
    if action.starts_with('/') {
        Some(format!("{}{}", base, action))
    } else {
        Some(format!("{}/{}", base, action))
    }
}

/// Cookie first, then an explicit value, then the hidden form field.
pub fn resolve_csrf_token(
    cookie_header: Option<&str>,
    cookie_name: &str,
    explicit: Option<&str>,
    form_field_value: Option<&str>,
) -> Option<CsrfToken> {
    if let Some(v) = cookie_header.and_then(|c| parse_cookie_value(c, cookie_name)) {
        return Some(CsrfToken { value: v, source: TokenSource::Cookie });
    }
    if let Some(v) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(CsrfToken { value: v.to_string(), source: TokenSource::Explicit });
    }
    form_field_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| CsrfToken { value: v.to_string(), source: TokenSource::FormField })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <form id="upload-form" method="post" action="/projects/42/upload-folder/" enctype="multipart/form-data">
          <input type="hidden" value="tok-from-form" name="csrfmiddlewaretoken">
          <input type="file" name="folder" webkitdirectory>
        </form>"#;

    #[test]
    fn cookie_value_found_among_others() {
        let c = "sessionid=xyz; csrftoken=abc123; theme=dark";
        assert_eq!(parse_cookie_value(c, "csrftoken").as_deref(), Some("abc123"));
        assert_eq!(parse_cookie_value(c, "missing"), None);
        assert_eq!(parse_cookie_value("csrftoken=", "csrftoken"), None);
    }

    #[test]
    fn hidden_input_in_any_attribute_order() {
        assert_eq!(
            parse_hidden_input(PAGE, "csrfmiddlewaretoken").as_deref(),
            Some("tok-from-form")
        );
        assert_eq!(parse_hidden_input(PAGE, "other"), None);
    }

    #[test]
    fn form_action_and_resolution() {
        let action = parse_form_action(PAGE).unwrap();
        assert_eq!(action, "/projects/42/upload-folder/");
        assert_eq!(
            resolve_action(&action, Some("https://studio.test/")).as_deref(),
            Some("https://studio.test/projects/42/upload-folder/")
        );
        assert_eq!(resolve_action(&action, None), None);
        assert_eq!(
            resolve_action("https://other.test/u", None).as_deref(),
            Some("https://other.test/u")
        );
    }

    #[test]
    fn token_prefers_cookie_then_explicit_then_form() {
        let t = resolve_csrf_token(Some("csrftoken=c"), "csrftoken", Some("e"), Some("f")).unwrap();
        assert_eq!(t, CsrfToken { value: "c".into(), source: TokenSource::Cookie });

        let t = resolve_csrf_token(Some("a=b"), "csrftoken", Some("e"), Some("f")).unwrap();
        assert_eq!(t.source, TokenSource::Explicit);

        let t = resolve_csrf_token(None, "csrftoken", Some("  "), Some("f")).unwrap();
        assert_eq!(t, CsrfToken { value: "f".into(), source: TokenSource::FormField });

        assert!(resolve_csrf_token(None, "csrftoken", None, None).is_none());
    }
}
