//! Custom `format` keywords registered on every engine instance.
//!
//! `http-url` uses structural URL parsing. Only `http`/`https` on their
//! standard ports are accepted, and the host must carry a non-blank label
//! after its first dot.

use url::Url;

/// Name of the HTTP URL format.
pub const HTTP_URL: &str = "http-url";

/// Returns true for `http`/`https` URLs on ports 80/443 (explicit or implicit)
/// whose host has a non-blank second dot-separated label.
pub fn is_http_url(value: &str) -> bool {
    let Ok(url) = Url::parse(value) else {
        return false;
    };

    // `Url::port` is `None` for the scheme's default port.
    let standard_port = match url.scheme() {
        "http" => matches!(url.port(), None | Some(80)),
        "https" => matches!(url.port(), None | Some(443)),
        _ => false,
    };

    standard_port
        && url
            .host_str()
            .and_then(|host| host.split('.').nth(1))
            .is_some_and(|label| !label.trim().is_empty())
}

/// Format whose check panics, registered only in test builds.
#[cfg(test)]
pub(crate) const PANICKING: &str = "test-panicking";

#[cfg(test)]
pub(crate) fn panicking(_: &str) -> bool {
    panic!("format check exploded")
}
