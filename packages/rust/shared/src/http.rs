//! HTTP client construction shared by listing requests and image downloads.

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;

use crate::error::{Result, WatchshotsError};

/// Maximum number of redirects followed by any watchshots request.
pub const MAX_REDIRECTS: usize = 5;

/// Build the reqwest client used for every outbound request.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| WatchshotsError::Network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn redirect_chain(server: &MockServer, hops: usize) {
        for i in 0..hops {
            Mock::given(method("GET"))
                .and(path(format!("/hop/{i}")))
                .respond_with(
                    ResponseTemplate::new(302)
                        .insert_header("location", format!("{}/hop/{}", server.uri(), i + 1)),
                )
                .mount(server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(format!("/hop/{hops}")))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sends_configured_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ua"))
            .and(header("user-agent", "watchshots-test/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_client("watchshots-test/1.0", Duration::from_secs(5)).unwrap();
        let resp = client.get(format!("{}/ua", server.uri())).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn follows_redirects_up_to_limit() {
        let server = MockServer::start().await;
        redirect_chain(&server, MAX_REDIRECTS).await;

        let client = build_client("watchshots-test/1.0", Duration::from_secs(5)).unwrap();
        let resp = client.get(format!("{}/hop/0", server.uri())).send().await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "done");
    }

    #[tokio::test]
    async fn too_many_redirects_is_an_error() {
        let server = MockServer::start().await;
        redirect_chain(&server, MAX_REDIRECTS + 1).await;

        let client = build_client("watchshots-test/1.0", Duration::from_secs(5)).unwrap();
        let err = client.get(format!("{}/hop/0", server.uri())).send().await.unwrap_err();
        assert!(err.is_redirect());
    }
}
