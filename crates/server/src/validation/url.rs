use url::Url;

/// Normalize an external link: http(s) only, no fragment, no trailing slash.
pub fn normalize_url(raw_url: &str) -> Result<String, &'static str> {
    let mut url = Url::parse(raw_url.trim()).map_err(|_| "must be a valid URL")?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err("only http(s) URLs are supported"),
    }

    if url.host_str().is_none() {
        return Err("must include a host");
    }

    url.set_fragment(None);

    let mut normalized: String = url.into();
    while normalized.ends_with('/') {
        normalized.pop();
    }

    Ok(normalized)
}

/// Accepts either an absolute http(s) URL or a site-relative path such as
/// `/uploads/abc.jpg` pointing at uploaded media.
pub fn normalize_asset_ref(raw: &str) -> Result<String, &'static str> {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') && !trimmed.starts_with("//") {
        if trimmed.contains("..") || trimmed.chars().any(char::is_whitespace) {
            return Err("must be a clean site-relative path");
        }
        return Ok(trimmed.to_string());
    }
    normalize_url(trimmed)
}
