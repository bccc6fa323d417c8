// src/aws/inject.rs

//! Credential injection for handler code.
//!
//! Handlers never build AWS clients from the ambient environment. They ask
//! the `ClientFactory` on their `InvocationContext`, which fills in the
//! configured credentials, region and endpoint. This lets handler code
//! written for real AWS talk to LocalStack (or any other target) without
//! modification.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

use crate::aws::accessor::ServiceClient;
use crate::config::ConnectionSettings;

/// Parameters a caller may pass when building a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientRequest {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

/// Apply configured settings over a caller's request.
///
/// A configured, non-empty value always wins. Anything not configured
/// keeps whatever the caller asked for.
pub fn inject(settings: &ConnectionSettings, mut request: ClientRequest) -> ClientRequest {
    fn apply(configured: Option<&str>, slot: &mut Option<String>) {
        if let Some(value) = configured {
            *slot = Some(value.to_string());
        }
    }

    apply(settings.access_key_id(), &mut request.access_key_id);
    apply(settings.secret_access_key(), &mut request.secret_access_key);
    apply(settings.session_token(), &mut request.session_token);
    apply(settings.region(), &mut request.region);
    apply(settings.endpoint_url(), &mut request.endpoint_url);

    request
}

/// Load an SDK config for a fully resolved request.
async fn load_sdk_config(profile: Option<&str>, request: &ClientRequest) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    if let Some(region) = &request.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let (Some(key), Some(secret)) = (&request.access_key_id, &request.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            key.clone(),
            secret.clone(),
            request.session_token.clone(),
            None,
            "qldebugger",
        ));
    }
    if let Some(url) = &request.endpoint_url {
        loader = loader.endpoint_url(url.clone());
    }

    loader.load().await
}

/// Builds clients with the configured settings injected.
///
/// Handler code gets fresh clients through `client`. The runner's
/// `ClientAccessor` loads its one shared SDK config through `sdk_config`,
/// so both paths resolve credentials the same way.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    settings: ConnectionSettings,
}

impl ClientFactory {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// The request a client would actually be built with.
    pub fn resolve(&self, request: ClientRequest) -> ClientRequest {
        inject(&self.settings, request)
    }

    pub async fn sdk_config(&self, request: ClientRequest) -> SdkConfig {
        let resolved = self.resolve(request);
        load_sdk_config(self.settings.profile(), &resolved).await
    }

    pub async fn client<C: ServiceClient>(&self, request: ClientRequest) -> C {
        tracing::debug!("Building {} client for handler...", C::SERVICE);
        C::from_conf(&self.sdk_config(request).await)
    }

    pub async fn sqs(&self) -> aws_sdk_sqs::Client {
        self.client(ClientRequest::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> ConnectionSettings {
        ConnectionSettings {
            profile: None,
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            session_token: Some(String::new()),
            region: Some("us-east-1".to_string()),
            endpoint_url: Some("http://localhost:4566/".to_string()),
        }
    }

    #[test]
    fn unset_request_takes_configured_values() {
        let resolved = inject(&configured(), ClientRequest::default());

        assert_eq!(resolved.access_key_id.as_deref(), Some("key"));
        assert_eq!(resolved.secret_access_key.as_deref(), Some("secret"));
        assert_eq!(resolved.region.as_deref(), Some("us-east-1"));
        assert_eq!(resolved.endpoint_url.as_deref(), Some("http://localhost:4566/"));
        // empty configured value counts as unset
        assert_eq!(resolved.session_token, None);
    }

    #[test]
    fn configured_values_override_caller() {
        let request = ClientRequest {
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("https://sqs.eu-west-1.amazonaws.com".to_string()),
            ..Default::default()
        };

        let resolved = inject(&configured(), request);

        assert_eq!(resolved.region.as_deref(), Some("us-east-1"));
        assert_eq!(resolved.endpoint_url.as_deref(), Some("http://localhost:4566/"));
    }

    #[test]
    fn caller_values_survive_when_nothing_configured() {
        let request = ClientRequest {
            region: Some("eu-west-1".to_string()),
            session_token: Some("token".to_string()),
            ..Default::default()
        };

        let resolved = inject(&ConnectionSettings::default(), request.clone());

        assert_eq!(resolved, request);
    }

    #[test]
    fn factory_resolves_through_settings() {
        let factory = ClientFactory::new(configured());
        let resolved = factory.resolve(ClientRequest::default());
        assert_eq!(resolved, inject(&configured(), ClientRequest::default()));
    }

    #[tokio::test]
    async fn sdk_config_carries_configured_target() {
        let factory = ClientFactory::new(configured());
        let request = ClientRequest {
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("https://sqs.eu-west-1.amazonaws.com".to_string()),
            ..Default::default()
        };

        let sdk_config = factory.sdk_config(request).await;

        assert_eq!(sdk_config.region().map(|r| r.as_ref()), Some("us-east-1"));
        assert_eq!(sdk_config.endpoint_url(), Some("http://localhost:4566/"));
    }

    #[tokio::test]
    async fn client_is_built_for_configured_target() {
        let factory = ClientFactory::new(configured());

        let sqs: aws_sdk_sqs::Client = factory.client(ClientRequest::default()).await;
        assert_eq!(
            sqs.config().region().map(|r| r.as_ref()),
            Some("us-east-1")
        );

        let sns: aws_sdk_sns::Client = factory
            .client(ClientRequest {
                region: Some("ap-south-1".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(
            sns.config().region().map(|r| r.as_ref()),
            Some("us-east-1")
        );
    }

    #[tokio::test]
    async fn caller_region_used_when_none_configured() {
        let factory = ClientFactory::new(ConnectionSettings {
            region: None,
            ..configured()
        });

        let sqs: aws_sdk_sqs::Client = factory
            .client(ClientRequest {
                region: Some("ap-south-1".to_string()),
                ..Default::default()
            })
            .await;

        assert_eq!(
            sqs.config().region().map(|r| r.as_ref()),
            Some("ap-south-1")
        );
    }
}
