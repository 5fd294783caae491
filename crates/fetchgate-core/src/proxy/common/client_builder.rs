use std::time::Duration;

/// Build the HTTP client used for passthrough requests.
///
/// Redirect handling is fixed per client, so the upstream keeps one client that
/// follows redirects and one that does not.
pub fn build_http_client(
    timeout_secs: u64,
    follow_redirects: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let redirect = if follow_redirects {
        reqwest::redirect::Policy::limited(20)
    } else {
        reqwest::redirect::Policy::none()
    };

    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(5)))
        .connect_timeout(Duration::from_secs(10))
        .tcp_nodelay(true)
        .redirect(redirect)
        .build()
}
