//! Resolve which controller session owns a request.
//!
//! The window that issued a request is not necessarily the window that
//! controls the scope (iframes, workers, windows opened before activation),
//! so routing follows the controlling window and a single controller answers
//! for the whole scope.

use fetchgate_types::{ClientId, ClientType, InterceptedRequest, RequestMode};
use url::Url;

use crate::proxy::clients::{Client, ClientDirectory};
use crate::proxy::registry::SessionRegistry;

pub struct SessionResolver {
    scope: Url,
}

impl SessionResolver {
    pub fn new(scope: Url) -> Self {
        Self { scope }
    }

    pub fn resolve(
        &self,
        request: &InterceptedRequest,
        issuing_client: Option<&ClientId>,
        directory: &ClientDirectory,
        registry: &SessionRegistry,
    ) -> Option<Client> {
        let scope_path = self.scope.path();

        if self.targets_scope_root(request) {
            let client = issuing_client.and_then(|id| directory.get(id));
            tracing::trace!(
                "[Resolver] {} hits scope root, issuing client {:?}",
                request.url,
                client.as_ref().map(|c| &c.id)
            );
            return client;
        }

        directory
            .match_all(ClientType::Window)
            .into_iter()
            .filter(|client| {
                // A client that has not navigated yet has no URL; fall back to
                // the request's referrer, then to the proxy's own location.
                self.client_url(client, request)
                    .is_some_and(|url| url.path().starts_with(scope_path))
            })
            .find(|client| registry.is_active(&client.id))
    }

    fn targets_scope_root(&self, request: &InterceptedRequest) -> bool {
        matches!(request.mode, RequestMode::Navigate | RequestMode::Cors)
            && Url::parse(&request.url).is_ok_and(|url| url.path() == self.scope.path())
    }

    fn client_url(&self, client: &Client, request: &InterceptedRequest) -> Option<Url> {
        if let Some(url) = &client.url {
            return Some(url.clone());
        }
        if request.referrer.is_empty() {
            return Some(self.scope.clone());
        }
        self.scope.join(&request.referrer).ok()
    }
}
