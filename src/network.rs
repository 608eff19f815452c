//! Network reachability probing.
//!
//! `network_check` asks a [`ReachabilityProbe`] about a small fixed set of
//! well-known endpoints. The production probe issues blocking HTTP GETs with
//! a short per-request timeout so one dead endpoint cannot stall the run.

use std::fmt;
use std::time::Duration;

/// Endpoints probed by `network_check`, in order.
pub const PROBE_URLS: &[&str] = &["https://www.google.com/generate_204", "https://github.com"];

/// Per-request timeout for each probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(7);

/// Result of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// Answered with this HTTP status
    Status(u16),
    /// No usable answer (DNS, TLS, timeout...)
    Unreachable(String),
}

impl Reachability {
    /// 2xx or 3xx
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Status(code) if (200..400).contains(code))
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Unreachable(reason) => write!(f, "unreachable ({})", reason),
        }
    }
}

/// Something that can tell whether a URL answers.
pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self, url: &str) -> Reachability;
}

/// Blocking HTTP probe.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self {
            timeout: PROBE_TIMEOUT,
        }
    }
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ReachabilityProbe for HttpProbe {
    fn probe(&self, url: &str) -> Reachability {
        // Redirects count as reachable, so do not follow them
        let client = match reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("holmes-setup/", env!("CARGO_PKG_VERSION")))
            .build()
        {
            Ok(client) => client,
            Err(e) => return Reachability::Unreachable(e.to_string()),
        };

        match client.get(url).send() {
            Ok(resp) => Reachability::Status(resp.status().as_u16()),
            Err(e) => Reachability::Unreachable(e.to_string()),
        }
    }
}

/// Probe for tests and offline previews: fixed answer for every URL.
#[derive(Debug, Clone)]
pub struct StaticProbe(pub Reachability);

impl ReachabilityProbe for StaticProbe {
    fn probe(&self, _url: &str) -> Reachability {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ranges() {
        assert!(Reachability::Status(204).is_reachable());
        assert!(Reachability::Status(301).is_reachable());
        assert!(!Reachability::Status(404).is_reachable());
        assert!(!Reachability::Status(199).is_reachable());
        assert!(!Reachability::Unreachable("dns".into()).is_reachable());
    }

    #[test]
    fn test_display() {
        assert_eq!(Reachability::Status(204).to_string(), "HTTP 204");
        assert_eq!(
            Reachability::Unreachable("timed out".into()).to_string(),
            "unreachable (timed out)"
        );
    }

    #[test]
    fn test_static_probe() {
        let probe = StaticProbe(Reachability::Status(200));
        assert!(probe.probe(PROBE_URLS[0]).is_reachable());
    }
}
