use super::identity::IdentityPolicy;
use super::rejection::IngestError;
use crate::domain::{Job, SampleClass};
use crate::queue::JobQueue;
use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Multipart field carrying the raw message.
const FILE_FIELD: &str = "file";

/// State shared by the learn handlers.
#[derive(Debug, Clone)]
pub struct LearnState {
    queue: JobQueue,
    identity: Arc<IdentityPolicy>,
}

impl LearnState {
    pub fn new(queue: JobQueue, identity: IdentityPolicy) -> Self {
        Self {
            queue,
            identity: Arc::new(identity),
        }
    }
}

/// Split the part of the path after `/learn/` into class and identity.
pub fn parse_learn_path(rest: &str) -> Result<(SampleClass, String), IngestError> {
    let segments: Vec<&str> = rest.split('/').collect();
    let [class, identity] = segments.as_slice() else {
        return Err(IngestError::InvalidPath);
    };

    let class = class
        .parse::<SampleClass>()
        .map_err(|_| IngestError::UnknownClass)?;
    if identity.is_empty() {
        return Err(IngestError::InvalidUser);
    }
    Ok((class, identity.to_string()))
}

/// Handler for POST /learn/{class}/{identity}
///
/// Replies 200 with an empty body once the sample is queued. Training happens
/// later on the dispatch worker; its outcome is never reported to the caller.
pub async fn learn_handler(
    State(state): State<LearnState>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    request: Request,
) -> Result<StatusCode, IngestError> {
    // Undecodable escapes (e.g. `%FF`) are just another malformed path.
    let Path(rest) = path.map_err(|_| IngestError::InvalidPath)?;
    let (class, identity) = parse_learn_path(&rest)?;
    state.identity.verify(&headers, &identity)?;

    let payload = read_upload(request).await?;
    let size = payload.len();
    let job = Job::new(class, identity.clone(), payload);

    let counts = state
        .queue
        .enqueue(job)
        .await
        .map_err(|_| IngestError::QueueClosed)?;

    debug!(
        user = %identity,
        %class,
        size,
        queued = counts.queued,
        dequeued = counts.dequeued,
        "Queued sample"
    );
    Ok(StatusCode::OK)
}

/// Answers everything that is not a POST to a learn path.
pub async fn fallback_handler(method: Method, uri: Uri) -> IngestError {
    if method != Method::POST {
        return IngestError::MethodNotAllowed;
    }
    if uri.path().starts_with("/learn/") {
        // `/learn/` with nothing after it never reaches the learn route.
        return IngestError::InvalidPath;
    }
    IngestError::NotFound
}

/// Read the `file` part of a multipart body into memory.
async fn read_upload(request: Request) -> Result<Bytes, IngestError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| IngestError::Form(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::Form(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        return field
            .bytes()
            .await
            .map_err(|e| IngestError::Upload(e.body_text()));
    }

    Err(IngestError::MissingFile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_and_identity() {
        let (class, identity) = parse_learn_path("spam/alice").unwrap();
        assert_eq!(class, SampleClass::Spam);
        assert_eq!(identity, "alice");
    }

    #[test]
    fn wrong_segment_count_is_invalid_path() {
        assert_eq!(parse_learn_path("spam"), Err(IngestError::InvalidPath));
        assert_eq!(parse_learn_path(""), Err(IngestError::InvalidPath));
        assert_eq!(
            parse_learn_path("spam/alice/extra"),
            Err(IngestError::InvalidPath)
        );
    }

    #[test]
    fn class_is_checked_before_identity() {
        assert_eq!(parse_learn_path("unknown/alice"), Err(IngestError::UnknownClass));
        assert_eq!(parse_learn_path("/alice"), Err(IngestError::UnknownClass));
        assert_eq!(parse_learn_path("unknown/"), Err(IngestError::UnknownClass));
    }

    #[test]
    fn empty_identity_is_invalid_user() {
        assert_eq!(parse_learn_path("ham/"), Err(IngestError::InvalidUser));
    }

    #[tokio::test]
    async fn fallback_distinguishes_method_and_path() {
        let learn: Uri = "/learn/spam/alice".parse().unwrap();
        let other: Uri = "/other".parse().unwrap();
        let bare: Uri = "/learn/".parse().unwrap();

        assert_eq!(
            fallback_handler(Method::GET, learn).await,
            IngestError::MethodNotAllowed
        );
        assert_eq!(
            fallback_handler(Method::PUT, other.clone()).await,
            IngestError::MethodNotAllowed
        );
        assert_eq!(fallback_handler(Method::POST, other).await, IngestError::NotFound);
        assert_eq!(
            fallback_handler(Method::POST, bare).await,
            IngestError::InvalidPath
        );
    }
}
