//! Per-client request quotas for the unauthenticated auth endpoints.
//!
//! Limiters are keyed by the peer IP address. A quota of `n` requests per
//! window refills one slot every `window / n` and allows bursts of `n`.

use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use actix_web::HttpRequest;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};

use crate::domain::Error;

/// Keyed limiter; clones share state.
#[derive(Clone)]
pub struct ClientRateLimiter {
    name: &'static str,
    limiter: Option<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
}

impl ClientRateLimiter {
    /// Allow `requests` per `window` for each client. A zero count disables
    /// the limiter.
    pub fn new(name: &'static str, requests: u32, window: Duration) -> Self {
        let limiter = NonZeroU32::new(requests)
            .and_then(|burst| {
                Quota::with_period(window / burst.get()).map(|quota| quota.allow_burst(burst))
            })
            .map(|quota| Arc::new(RateLimiter::keyed(quota)));
        Self { name, limiter }
    }

    pub fn disabled(name: &'static str) -> Self {
        Self {
            name,
            limiter: None,
        }
    }

    /// Count one request from `client`, failing with 429 once the quota is
    /// spent.
    pub fn check(&self, client: IpAddr) -> Result<(), Error> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter.check_key(&client).map_err(|_| {
            warn!(limiter = self.name, %client, "rate limit exceeded");
            Error::rate_limited("Too many attempts, please try again later.")
        })
    }

    /// Count one request from the peer behind `req`.
    pub fn check_request(&self, req: &HttpRequest) -> Result<(), Error> {
        self.check(client_ip(req))
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }

    /// Drop clients whose quota has fully refilled and return how many
    /// remain tracked.
    pub fn prune(&self) -> usize {
        let Some(limiter) = &self.limiter else {
            return 0;
        };
        let before = limiter.len();
        limiter.retain_recent();
        limiter.shrink_to_fit();
        let after = limiter.len();
        if after < before {
            debug!(
                limiter = self.name,
                pruned = before - after,
                tracked = after,
                "rate limiter pruned"
            );
        }
        after
    }
}

/// Quotas applied to the auth surface.
#[derive(Clone)]
pub struct AuthRateLimits {
    /// Login, registration and password reset.
    pub auth: ClientRateLimiter,
    pub forgot_password: ClientRateLimiter,
}

impl AuthRateLimits {
    pub fn new(auth_per_minute: u32, forgot_password_per_five_minutes: u32) -> Self {
        Self {
            auth: ClientRateLimiter::new("auth", auth_per_minute, Duration::from_secs(60)),
            forgot_password: ClientRateLimiter::new(
                "forgot_password",
                forgot_password_per_five_minutes,
                Duration::from_secs(300),
            ),
        }
    }

    pub fn disabled() -> Self {
        Self {
            auth: ClientRateLimiter::disabled("auth"),
            forgot_password: ClientRateLimiter::disabled("forgot_password"),
        }
    }

    pub fn prune(&self) {
        self.auth.prune();
        self.forgot_password.prune();
    }

    /// Prune every limiter each `period` for the life of the runtime.
    pub fn spawn_pruning(&self, period: Duration) -> tokio::task::JoinHandle<()> {
        let limits = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limits.prune();
            }
        })
    }
}

impl Default for AuthRateLimits {
    fn default() -> Self {
        Self::new(10, 3)
    }
}

/// Peer address of the connection; forwarding headers are not trusted.
fn client_ip(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[rstest]
    fn quota_is_per_client() {
        let limiter = ClientRateLimiter::new("test", 3, Duration::from_secs(300));
        for _ in 0..3 {
            assert!(limiter.check(ip(1)).is_ok());
        }
        let err = limiter.check(ip(1)).expect_err("fourth request refused");
        assert_eq!(err.code(), ErrorCode::RateLimited);
        assert!(limiter.check(ip(2)).is_ok());
    }

    #[rstest]
    fn clones_share_the_same_budget() {
        let limiter = ClientRateLimiter::new("test", 1, Duration::from_secs(60));
        let clone = limiter.clone();
        assert!(limiter.check(ip(1)).is_ok());
        assert!(clone.check(ip(1)).is_err());
    }

    #[rstest]
    fn refilled_clients_are_forgotten() {
        let limiter = ClientRateLimiter::new("test", 2, Duration::from_millis(200));
        for last in 1..=3 {
            assert!(limiter.check(ip(last)).is_ok());
        }
        assert_eq!(limiter.prune(), 3);

        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(limiter.prune(), 0);
        assert!(limiter.check(ip(1)).is_ok());
    }

    #[rstest]
    fn disabled_limiters_track_nobody() {
        let limiter = ClientRateLimiter::disabled("off");
        assert!(limiter.check(ip(1)).is_ok());
        assert_eq!(limiter.prune(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn background_pruning_forgets_idle_clients() {
        let limits = AuthRateLimits {
            auth: ClientRateLimiter::new("auth", 2, Duration::from_millis(100)),
            forgot_password: ClientRateLimiter::disabled("forgot_password"),
        };
        assert!(limits.auth.check(ip(7)).is_ok());
        assert_eq!(limits.auth.tracked(), 1);

        let task = limits.spawn_pruning(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(300)).await;
        task.abort();
        assert_eq!(limits.auth.tracked(), 0);
    }

    #[rstest]
    #[case(ClientRateLimiter::new("zero", 0, Duration::from_secs(60)))]
    #[case(ClientRateLimiter::disabled("off"))]
    fn disabled_limiters_never_refuse(#[case] limiter: ClientRateLimiter) {
        for _ in 0..50 {
            assert!(limiter.check(ip(1)).is_ok());
        }
    }
}
