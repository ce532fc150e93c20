//! Conversions from external infrastructure errors into domain errors.

use std::io::Error as IoError;
use std::time::Duration;

use reqwest::Error as HttpError;
use spapi_domain::SpApiError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SpApiError);

impl InfraError {
    /// A time budget ran out during `phase` (response, idle, deadline).
    pub fn timeout(phase: &str, budget: Duration) -> Self {
        InfraError(SpApiError::Transport {
            message: format!("{phase} timeout of {} ms exceeded", budget.as_millis()),
            timeout: Some(budget),
        })
    }
}

impl From<InfraError> for SpApiError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SpApiError> for InfraError {
    fn from(value: SpApiError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSpApiError {
    fn into_spapi(self) -> SpApiError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SpApiError */
/* -------------------------------------------------------------------------- */

impl IntoSpApiError for HttpError {
    fn into_spapi(self) -> SpApiError {
        let message = if self.is_timeout() {
            format!("HTTP request timed out: {self}")
        } else if self.is_connect() {
            format!("HTTP connection failure: {self}")
        } else if self.is_body() || self.is_decode() {
            format!("HTTP body could not be read: {self}")
        } else {
            format!("HTTP request failed: {self}")
        };
        SpApiError::Transport { message, timeout: None }
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_spapi())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → SpApiError */
/* -------------------------------------------------------------------------- */

impl IntoSpApiError for IoError {
    fn into_spapi(self) -> SpApiError {
        SpApiError::Io(format!("{:?}: {self}", self.kind()))
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(value.into_spapi())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;
    use std::net::TcpListener;

    use reqwest::Client;

    use super::*;

    #[test]
    fn io_not_found_maps_to_io_error() {
        let err = IoError::new(ErrorKind::NotFound, "feed.xml");
        let mapped: SpApiError = InfraError::from(err).into();
        match mapped {
            SpApiError::Io(msg) => assert!(msg.contains("NotFound") && msg.contains("feed.xml")),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn timeout_carries_budget() {
        let mapped: SpApiError = InfraError::timeout("idle", Duration::from_millis(250)).into();
        assert_eq!(mapped.retry_after(), Some(Duration::from_millis(250)));
        assert!(mapped.to_string().contains("idle timeout of 250 ms"));
    }

    #[tokio::test]
    async fn connection_refused_maps_to_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: SpApiError = InfraError::from(error).into();
        match mapped {
            SpApiError::Transport { message, timeout } => {
                assert!(message.starts_with("HTTP"));
                assert_eq!(timeout, None);
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
