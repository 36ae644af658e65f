//! EKS bearer token minting
//!
//! An EKS token is a presigned STS `GetCallerIdentity` URL, base64url-encoded
//! without padding and prefixed with `k8s-aws-v1.`. The control plane
//! replays the URL against STS to learn the caller's identity, and checks the
//! signed `x-k8s-aws-id` header to make sure the token was minted for this
//! cluster. The API server does a literal format check on the prefix and the
//! alphabet, so both must match exactly.

use std::fmt;
use std::time::{Duration, SystemTime};

use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SignatureLocation, SigningParams, SigningSettings,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::debug;

use eks_toggle_common::Error;

/// Scheme marker every EKS token starts with
pub const TOKEN_PREFIX: &str = "k8s-aws-v1.";

/// Validity window of a minted token
pub const TOKEN_TTL: Duration = Duration::from_secs(60);

/// Header binding the presigned request to one cluster
pub const CLUSTER_ID_HEADER: &str = "x-k8s-aws-id";

const STS_SIGNING_NAME: &str = "sts";

/// Bearer credential for one cluster, valid for [`TOKEN_TTL`].
///
/// Lives for a single invocation. `Debug` never prints the token.
pub struct EphemeralCredential {
    token: String,
    /// Instant after which the control plane rejects the token
    pub expires_at: DateTime<Utc>,
    /// Region whose STS endpoint the token was signed for
    pub region: String,
}

impl EphemeralCredential {
    /// The bearer token
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for EphemeralCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("region", &self.region)
            .finish()
    }
}

/// Regional STS endpoint the token is presigned against
pub fn sts_url(region: &str) -> String {
    format!(
        "https://sts.{}.amazonaws.com/?Action=GetCallerIdentity&Version=2011-06-15",
        region
    )
}

/// Mint a token for `cluster` from already-resolved credentials.
///
/// Pure apart from the signature itself: the same credentials, cluster,
/// region and `now` always produce the same token.
pub fn mint_token(
    credentials: &Credentials,
    cluster: &str,
    region: &str,
    now: SystemTime,
) -> Result<EphemeralCredential, Error> {
    let identity: Identity = credentials.clone().into();

    let mut settings = SigningSettings::default();
    settings.signature_location = SignatureLocation::QueryParams;
    settings.expires_in = Some(TOKEN_TTL);

    let params: SigningParams<'_> = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name(STS_SIGNING_NAME)
        .time(now)
        .settings(settings)
        .build()
        .map_err(|e| {
            Error::authentication_for(cluster, format!("invalid signing parameters: {}", e))
        })?
        .into();

    let url = sts_url(region);
    let signable = SignableRequest::new(
        "GET",
        url.as_str(),
        std::iter::once((CLUSTER_ID_HEADER, cluster)),
        SignableBody::Bytes(&[]),
    )
    .map_err(|e| Error::authentication_for(cluster, format!("unsignable request: {}", e)))?;

    let (instructions, _signature) = sign(signable, &params)
        .map_err(|e| Error::authentication_for(cluster, format!("signing failed: {}", e)))?
        .into_parts();

    let mut request = http::Request::builder()
        .method("GET")
        .uri(url.as_str())
        .header(CLUSTER_ID_HEADER, cluster)
        .body(())
        .map_err(|e| Error::authentication_for(cluster, format!("invalid STS request: {}", e)))?;
    instructions.apply_to_request_http1x(&mut request);

    let signed_url = request.uri().to_string();
    let token = format!("{}{}", TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(signed_url));

    let ttl = chrono::Duration::seconds(TOKEN_TTL.as_secs() as i64);
    Ok(EphemeralCredential {
        token,
        expires_at: DateTime::<Utc>::from(now) + ttl,
        region: region.to_string(),
    })
}

/// Mints tokens from the ambient AWS credential chain
pub struct TokenMinter {
    credentials: SharedCredentialsProvider,
}

impl TokenMinter {
    /// Create a minter over the given credential provider
    pub fn new(credentials: SharedCredentialsProvider) -> Self {
        Self { credentials }
    }

    /// Resolve credentials and mint a fresh token for `cluster`.
    ///
    /// No retry; a failure is returned to the caller as an authentication error.
    pub async fn mint(&self, cluster: &str, region: &str) -> Result<EphemeralCredential, Error> {
        let credentials = self.credentials.provide_credentials().await.map_err(|e| {
            Error::authentication_for(cluster, format!("failed to resolve AWS credentials: {}", e))
        })?;
        let credential = mint_token(&credentials, cluster, region, SystemTime::now())?;
        debug!(
            cluster = %cluster,
            region = %region,
            expires_at = %credential.expires_at,
            "Minted control-plane token"
        );
        Ok(credential)
    }
}
