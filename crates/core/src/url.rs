//! String-level URL helpers matching how the application cache keys hosts
//! and origins.
//!
//! These intentionally do not parse URLs: the consuming runtime derives its
//! keys from raw string positions, so `example.com` (no scheme) and
//! `https://example.com/path` both have to work.

/// Return `url` with a trailing `/`, appending one only if missing.
pub fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') { url.to_string() } else { format!("{url}/") }
}

/// Join a base URL and a relative resource path with exactly one `/`.
pub fn join(base: &str, relative: &str) -> String {
    let relative = relative.strip_prefix('/').unwrap_or(relative);
    format!("{}{relative}", with_trailing_slash(base))
}

/// Host part of a URL: everything after the first `//`, up to the next `/`.
pub fn host_for_url(url: &str) -> &str {
    let rest = match url.find("//") {
        Some(pos) => &url[pos + 2..],
        None => url,
    };
    match rest.find('/') {
        Some(pos) => &rest[..pos],
        None => rest,
    }
}

/// Security origin identifier in `scheme_host_port` form with the port fixed
/// at 0, e.g. `https://example.com/x` becomes `https_example.com_0`.
pub fn origin_for_url(url: &str) -> String {
    let mut origin = match url.find("://") {
        Some(pos) => format!("{}_{}", &url[..pos], &url[pos + 3..]),
        None => url.to_string(),
    };
    if let Some(pos) = origin.find('/') {
        origin.truncate(pos);
    }
    origin.push_str("_0");
    origin
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/path", "example.com")]
    #[case("example.com", "example.com")]
    #[case("http://site.test/", "site.test")]
    #[case("http://localhost:8080/a/b", "localhost:8080")]
    #[case("//cdn.test/lib.js", "cdn.test")]
    #[case("", "")]
    fn test_host_for_url(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(host_for_url(url), expected);
    }

    #[rstest]
    #[case("https://example.com/path", "https_example.com_0")]
    #[case("example.com/x", "example.com_0")]
    #[case("http://site.test/", "http_site.test_0")]
    #[case("http://localhost:8080", "http_localhost:8080_0")]
    #[case("", "_0")]
    fn test_origin_for_url(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(origin_for_url(url), expected);
    }

    #[test]
    fn test_with_trailing_slash() {
        assert_eq!(with_trailing_slash("http://site.test"), "http://site.test/");
        assert_eq!(with_trailing_slash("http://site.test/"), "http://site.test/");
    }

    #[rstest]
    #[case("http://site.test", "index.html", "http://site.test/index.html")]
    #[case("http://site.test/", "/index.html", "http://site.test/index.html")]
    #[case("http://site.test/docs", "a/b.css", "http://site.test/docs/a/b.css")]
    fn test_join(#[case] base: &str, #[case] relative: &str, #[case] expected: &str) {
        assert_eq!(join(base, relative), expected);
    }
}
