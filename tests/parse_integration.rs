use reelpack::parse;

const UPLOAD_PAGE: &str = r#"<!doctype html>
<html><body>
<form method="post" enctype="multipart/form-data" action="/projects/7/upload-folder/" id="folder-upload">
  <input name="csrfmiddlewaretoken" type="hidden" value="form-tok">
  <input type="file" name="folder" webkitdirectory multiple>
  <button type="submit">Upload</button>
</form>
</body></html>"#;

#[test]
fn test_parse_cookie_value_with_spaces_and_quotes() {
    let v = parse::parse_cookie_value(" sessionid=1 ;csrftoken=\"q\" ", "csrftoken");
    assert_eq!(v.as_deref(), Some("q"));
}

#[test]
fn test_form_page_supplies_endpoint_and_token() {
    let action = parse::parse_form_action(UPLOAD_PAGE).unwrap();
    let endpoint = parse::resolve_action(&action, Some("http://127.0.0.1:8000")).unwrap();
    assert_eq!(endpoint, "http://127.0.0.1:8000/projects/7/upload-folder/");

    let hidden = parse::parse_hidden_input(UPLOAD_PAGE, "csrfmiddlewaretoken");
    let token = parse::resolve_csrf_token(None, "csrftoken", None, hidden.as_deref()).unwrap();
    assert_eq!(token.value, "form-tok");
    assert_eq!(token.source, parse::TokenSource::FormField);
}

#[test]
fn test_relative_action_without_slash() {
    assert_eq!(
        parse::resolve_action("upload/", Some("https://studio.test")).as_deref(),
        Some("https://studio.test/upload/")
    );
}

#[test]
fn test_cookie_token_wins_over_form() {
    let hidden = parse::parse_hidden_input(UPLOAD_PAGE, "csrfmiddlewaretoken");
    let token = parse::resolve_csrf_token(
        Some("csrftoken=cookie-tok; sessionid=abc"),
        "csrftoken",
        Some("explicit"),
        hidden.as_deref(),
    )
    .unwrap();
    assert_eq!(token.value, "cookie-tok");
    assert_eq!(token.source, parse::TokenSource::Cookie);
}

#[test]
fn test_page_without_form_yields_nothing() {
    assert!(parse::parse_form_action("<p>no form here</p>").is_none());
    assert!(parse::parse_hidden_input("<p>no form here</p>", "csrfmiddlewaretoken").is_none());
}
