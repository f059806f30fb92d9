//! Per-client rate limits for credential endpoints and anonymous tracking lookups.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use axum::{extract::ConnectInfo, http::Request};
use governor::{clock::QuantaInstant, middleware::NoOpMiddleware};
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor,
};

/// Keys requests by client IP. The socket peer is used unless the service
/// runs behind a proxy that rewrites `X-Forwarded-For` / `X-Real-IP`, in which
/// case `trust_proxy_headers` lets those headers win. Requests with no address
/// at all (in-process calls) share one bucket.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientIpKeyExtractor {
    pub trust_proxy_headers: bool,
}

impl ClientIpKeyExtractor {
    fn forwarded_ip<T>(req: &Request<T>) -> Option<IpAddr> {
        let headers = req.headers();
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
    }
}

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        if let Some(ip) = self
            .trust_proxy_headers
            .then(|| Self::forwarded_ip(req))
            .flatten()
        {
            return Ok(ip);
        }

        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return Ok(addr.ip());
        }

        Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(
    replenish_secs: u64,
    burst: u32,
    trust_proxy_headers: bool,
) -> anyhow::Result<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor { trust_proxy_headers })
        .per_second(replenish_secs)
        .burst_size(burst)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?;
    Ok(GovernorLayer::new(Arc::new(config)))
}

/// Login, registration and token endpoints: one request every 6 s, burst of 10.
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> anyhow::Result<RateLimiterLayer> {
    limiter(6, 10, trust_proxy_headers)
}

pub const TRACKING_BURST: u32 = 30;

/// Tracking lookups: one request per second, burst of [`TRACKING_BURST`].
pub fn tracking_rate_limiter(trust_proxy_headers: bool) -> anyhow::Result<RateLimiterLayer> {
    limiter(1, TRACKING_BURST, trust_proxy_headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUSTING: ClientIpKeyExtractor = ClientIpKeyExtractor {
        trust_proxy_headers: true,
    };
    const DIRECT: ClientIpKeyExtractor = ClientIpKeyExtractor {
        trust_proxy_headers: false,
    };

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let mut req = builder.body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 4000))));
        req
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn forwarded_headers_are_ignored_by_default() {
        for forwarded in ["10.0.0.1", "10.0.0.2", "10.0.0.3"] {
            let req = request(&[("x-forwarded-for", forwarded), ("x-real-ip", forwarded)]);
            assert_eq!(DIRECT.extract(&req).unwrap(), ip("198.51.100.4"));
        }
    }

    #[test]
    fn trusted_proxy_headers_win_over_the_peer() {
        let req = request(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.2"),
        ]);
        assert_eq!(TRUSTING.extract(&req).unwrap(), ip("203.0.113.7"));

        let req = request(&[("x-real-ip", "10.0.0.2")]);
        assert_eq!(TRUSTING.extract(&req).unwrap(), ip("10.0.0.2"));

        let req = request(&[("x-forwarded-for", "garbage")]);
        assert_eq!(TRUSTING.extract(&req).unwrap(), ip("198.51.100.4"));
    }

    #[test]
    fn requests_without_an_address_share_a_bucket() {
        let req = Request::builder().uri("/").body(()).unwrap();
        assert_eq!(
            DIRECT.extract(&req).unwrap(),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }

    #[test]
    fn limiters_build() {
        assert!(auth_rate_limiter(false).is_ok());
        assert!(tracking_rate_limiter(true).is_ok());
    }
}
