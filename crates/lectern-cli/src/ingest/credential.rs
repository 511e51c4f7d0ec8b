//! Upload credentials
//!
//! A credential is a presigned URL plus the object key it writes to. It is
//! issued for one lesson, moved into exactly one transfer attempt, and never
//! kept around afterwards.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Utc};
use lectern_common::types::LessonId;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::session::{FailureCause, FailureStage, StageFailure};
use crate::api::ApiClient;

/// Short-lived write capability for one object
#[derive(Debug, PartialEq, Eq)]
pub struct UploadCredential {
    presigned_url: Url,
    object_key: String,
    lesson_id: LessonId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl UploadCredential {
    /// Build a credential from the broker's response
    ///
    /// Expiry comes from the `X-Amz-Date`/`X-Amz-Expires` query parameters
    /// when the URL carries them, otherwise `issued_at + fallback_ttl`.
    pub fn new(
        lesson_id: LessonId,
        presigned_url: &str,
        object_key: &str,
        issued_at: DateTime<Utc>,
        fallback_ttl: Duration,
    ) -> Result<Self, FailureCause> {
        let object_key = object_key.trim();
        if object_key.is_empty() {
            return Err(FailureCause::MalformedResponse("empty object key".to_string()));
        }
        let presigned_url = Url::parse(presigned_url.trim()).map_err(|e| {
            FailureCause::MalformedResponse(format!("invalid presigned URL: {}", e))
        })?;
        if !matches!(presigned_url.scheme(), "http" | "https") {
            return Err(FailureCause::MalformedResponse(format!(
                "presigned URL has unsupported scheme '{}'",
                presigned_url.scheme()
            )));
        }

        let expires_at = match signed_expiry(&presigned_url)? {
            Some(expires_at) => expires_at,
            // A TTL past chrono's range means the credential never expires locally
            None => ChronoDuration::from_std(fallback_ttl)
                .ok()
                .and_then(|ttl| issued_at.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        Ok(Self {
            presigned_url,
            object_key: object_key.to_string(),
            lesson_id,
            issued_at,
            expires_at,
        })
    }

    pub fn presigned_url(&self) -> &Url {
        &self.presigned_url
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Refuse to start a transfer with an expired credential
    pub fn ensure_fresh(&self, now: DateTime<Utc>) -> Result<(), StageFailure> {
        if self.is_expired(now) {
            return Err(StageFailure::new(
                FailureStage::CredentialRequest,
                FailureCause::CredentialExpired(self.expires_at),
            ));
        }
        Ok(())
    }
}

/// Expiry encoded in an S3-style (SigV4) presigned URL
///
/// `Ok(None)` when the URL does not carry both parameters. An expiry that
/// cannot be represented is a malformed response.
fn signed_expiry(url: &Url) -> Result<Option<DateTime<Utc>>, FailureCause> {
    let mut signed_at = None;
    let mut expires_in = None;
    for (key, value) in url.query_pairs() {
        if key.eq_ignore_ascii_case("X-Amz-Date") {
            signed_at = NaiveDateTime::parse_from_str(&value, "%Y%m%dT%H%M%SZ").ok();
        } else if key.eq_ignore_ascii_case("X-Amz-Expires") {
            expires_in = value.parse::<i64>().ok();
        }
    }
    let (Some(signed_at), Some(expires_in)) = (signed_at, expires_in) else {
        return Ok(None);
    };

    ChronoDuration::try_seconds(expires_in)
        .filter(|lifetime| *lifetime >= ChronoDuration::zero())
        .and_then(|lifetime| Utc.from_utc_datetime(&signed_at).checked_add_signed(lifetime))
        .map(Some)
        .ok_or_else(|| {
            FailureCause::MalformedResponse(format!("invalid X-Amz-Expires: {}", expires_in))
        })
}

/// Exchanges a lesson id for an upload credential
#[derive(Clone)]
pub struct UploadCredentialBroker {
    api: ApiClient,
    fallback_ttl: Duration,
}

impl UploadCredentialBroker {
    pub fn new(api: ApiClient, fallback_ttl: Duration) -> Self {
        Self { api, fallback_ttl }
    }

    #[instrument(skip(self), fields(lesson_id = %lesson_id))]
    pub async fn request_credential(
        &self,
        lesson_id: LessonId,
    ) -> Result<UploadCredential, StageFailure> {
        let fail = |cause| StageFailure::new(FailureStage::CredentialRequest, cause);

        let response = self
            .api
            .request_upload_url(lesson_id)
            .await
            .map_err(|e| fail(FailureCause::from(e)))?;

        let credential = UploadCredential::new(
            lesson_id,
            &response.presigned_url,
            &response.object_key,
            Utc::now(),
            self.fallback_ttl,
        )
        .map_err(fail)?;

        debug!(
            object_key = %credential.object_key(),
            expires_at = %credential.expires_at(),
            "Upload credential issued"
        );
        Ok(credential)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_expiry_from_signed_url() {
        let url = "https://minio.local/videos/lessons/77/a.mp4?X-Amz-Algorithm=AWS4-HMAC-SHA256\
                   &X-Amz-Date=20261017T100000Z&X-Amz-Expires=900&X-Amz-Signature=abc";
        let credential = UploadCredential::new(
            LessonId(77),
            url,
            "lessons/77/a.mp4",
            at("2026-10-17T10:00:05Z"),
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(credential.expires_at(), at("2026-10-17T10:15:00Z"));
        assert!(!credential.is_expired(at("2026-10-17T10:14:59Z")));
        assert!(credential.is_expired(at("2026-10-17T10:15:00Z")));
    }

    #[test]
    fn test_expiry_falls_back_to_ttl() {
        let issued = at("2026-10-17T10:00:00Z");
        let credential = UploadCredential::new(
            LessonId(77),
            "https://store/put?token=x",
            "lessons/77/video.mp4",
            issued,
            Duration::from_secs(900),
        )
        .unwrap();
        assert_eq!(credential.expires_at(), at("2026-10-17T10:15:00Z"));
    }

    #[test]
    fn test_ensure_fresh() {
        let issued = at("2026-10-17T10:00:00Z");
        let credential = UploadCredential::new(
            LessonId(1),
            "https://store/put",
            "lessons/1/v.mp4",
            issued,
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(credential.ensure_fresh(issued).is_ok());

        let failure = credential.ensure_fresh(at("2026-10-17T10:00:10Z")).unwrap_err();
        assert_eq!(failure.stage, FailureStage::CredentialRequest);
        assert!(matches!(failure.cause, FailureCause::CredentialExpired(_)));
    }

    #[test]
    fn test_out_of_range_signed_expiry_is_malformed() {
        let now = at("2026-10-17T10:00:05Z");
        let ttl = Duration::from_secs(60);
        for expires in ["9223372036854775807", "9000000000000000", "-5"] {
            let url = format!(
                "https://store/put?X-Amz-Date=20261017T100000Z&X-Amz-Expires={}",
                expires
            );
            let cause = UploadCredential::new(LessonId(77), &url, "lessons/77/a.mp4", now, ttl)
                .unwrap_err();
            assert!(
                matches!(cause, FailureCause::MalformedResponse(ref m) if m.contains("X-Amz-Expires")),
                "unexpected cause for {}: {:?}",
                expires,
                cause
            );
        }
    }

    #[tokio::test]
    async fn test_out_of_range_signed_expiry_fails_credential_stage() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/lessons/77/request-upload-url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "presignedUrl": "https://store/put?X-Amz-Date=20261017T100000Z&X-Amz-Expires=9223372036854775807",
                "objectKey": "lessons/77/a.mp4"
            })))
            .mount(&server)
            .await;

        let config = crate::config::Config {
            server_url: server.uri(),
            ..crate::config::Config::default()
        };
        let api = ApiClient::new(
            &config,
            std::sync::Arc::new(crate::auth::StaticToken::new("t")),
        )
        .unwrap();
        let failure = UploadCredentialBroker::new(api, Duration::from_secs(900))
            .request_credential(LessonId(77))
            .await
            .unwrap_err();

        assert_eq!(failure.stage, FailureStage::CredentialRequest);
        assert!(matches!(failure.cause, FailureCause::MalformedResponse(_)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let issued = at("2026-10-17T10:00:00Z");
        let credential = UploadCredential::new(
            LessonId(77),
            "https://store/put?token=x",
            "lessons/77/video.mp4",
            issued,
            Duration::from_secs(u64::MAX),
        )
        .unwrap();
        assert_eq!(credential.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(credential.ensure_fresh(issued).is_ok());
    }

    #[test]
    fn test_malformed_credentials_rejected() {
        let now = Utc::now();
        let ttl = Duration::from_secs(60);
        assert!(UploadCredential::new(LessonId(1), "https://store/put", " ", now, ttl).is_err());
        assert!(UploadCredential::new(LessonId(1), "not a url", "k", now, ttl).is_err());
        assert!(UploadCredential::new(LessonId(1), "ftp://store/put", "k", now, ttl).is_err());
    }
}
