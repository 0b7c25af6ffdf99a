// SPDX-License-Identifier: MPL-2.0

use crate::api::ApiError;
use std::future::Future;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Cancellation scope for a store's in-flight requests.
///
/// Every request runs under the scope's current token. `cancel` aborts all of
/// them and installs a fresh token so later requests are unaffected.
#[derive(Debug, Default)]
pub struct RequestScope {
    token: Mutex<CancellationToken>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> CancellationToken {
        match self.token.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Token for a request started now
    pub fn token(&self) -> CancellationToken {
        self.current().child_token()
    }

    pub fn cancel(&self) {
        let mut token = match self.token.lock() {
            Ok(token) => token,
            Err(poisoned) => poisoned.into_inner(),
        };
        token.cancel();
        *token = CancellationToken::new();
    }

    /// Run `fut`, resolving to `ApiError::Cancelled` if the scope is cancelled first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        Self::run_under(&self.token(), fut).await
    }

    /// Run `fut` under a token taken earlier, so several dependent requests
    /// stop together.
    pub async fn run_under<T, F>(token: &CancellationToken, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if token.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ApiError::Cancelled),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let scope = RequestScope::new();
        let value = scope.run(async { Ok::<_, ApiError>(7) }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight() {
        let scope = Arc::new(RequestScope::new());
        let runner = scope.clone();
        let handle = tokio::spawn(async move {
            runner
                .run(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<_, ApiError>(())
                })
                .await
        });

        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        scope.cancel();
        assert_eq!(handle.await.unwrap(), Err(ApiError::Cancelled));

        // The scope is usable again after cancelling
        let value = scope.run(async { Ok::<_, ApiError>("fresh") }).await;
        assert_eq!(value, Ok("fresh"));
    }

    #[tokio::test]
    async fn test_shared_token_stays_cancelled() {
        let scope = RequestScope::new();
        let token = scope.token();
        scope.cancel();

        let mut polled = false;
        let value = RequestScope::run_under(&token, async {
            polled = true;
            Ok::<_, ApiError>(1)
        })
        .await;
        assert_eq!(value, Err(ApiError::Cancelled));
        assert!(!polled);

        // Tokens taken after the cancel are live
        assert_eq!(RequestScope::run_under(&scope.token(), async { Ok::<_, ApiError>(2) }).await, Ok(2));
    }
}
