use crate::api::dto::{CheckLimitRequest, CheckLimitResponse};
use crate::provider::RedisProvider;

/// Remaining quota reported for every user.
///
/// Quota accounting is not implemented, so this value is reported regardless of whether the
/// store is available. In particular it is the defined result when the service runs without a
/// store.
pub const DEFAULT_LIMIT_AVAILABLE: i64 = 0;

pub trait LimitUseCase: Send + Sync {
    fn check_limit(&self, request: &CheckLimitRequest) -> anyhow::Result<CheckLimitResponse>;
    fn reset_limit(&self, request: &CheckLimitRequest) -> anyhow::Result<CheckLimitResponse>;
}

/// Rate limit bookkeeping.
///
/// # Degraded mode
///
/// The store is optional. Without one, both operations succeed and report
/// [`DEFAULT_LIMIT_AVAILABLE`] for the requested user; they never fail because the store is
/// missing.
pub struct LimitService {
    store: Option<RedisProvider>,
}

impl LimitService {
    pub fn new(store: Option<RedisProvider>) -> Self {
        LimitService { store }
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    // TODO: read and reset the per-user quota in the store once a limit policy is defined.
    fn default_response(&self, request: &CheckLimitRequest) -> CheckLimitResponse {
        CheckLimitResponse {
            user_id: request.user_id,
            limit_available: DEFAULT_LIMIT_AVAILABLE,
        }
    }
}

impl LimitUseCase for LimitService {
    fn check_limit(&self, request: &CheckLimitRequest) -> anyhow::Result<CheckLimitResponse> {
        Ok(self.default_response(request))
    }

    fn reset_limit(&self, request: &CheckLimitRequest) -> anyhow::Result<CheckLimitResponse> {
        Ok(self.default_response(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_yields_the_default() {
        let service = LimitService::new(None);
        let request = CheckLimitRequest { user_id: 123 };

        assert!(!service.has_store());
        assert_eq!(
            service.check_limit(&request).unwrap(),
            CheckLimitResponse {
                user_id: 123,
                limit_available: DEFAULT_LIMIT_AVAILABLE
            }
        );
        assert_eq!(service.reset_limit(&request).unwrap().user_id, 123);
    }
}
