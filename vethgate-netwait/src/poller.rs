//! Sequential interface readiness wait

use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace};
use vethgate_core::config::INTERFACE_DELIMITER;
use vethgate_core::{InterfaceName, LaunchConfig, Result};

use crate::probe::InterfaceProbe;

/// Blocks until every managed interface in a list is up
///
/// Interfaces are awaited strictly left to right, one at a time. There is
/// no timeout: an interface that never comes up keeps the poller waiting
/// until the process is killed. A failed query aborts the whole wait.
///
/// The interval sleep blocks the calling thread. The wait is the startup
/// gate of a single-threaded process, and tokio's millisecond timer cannot
/// express sub-millisecond intervals.
#[derive(Debug)]
pub struct ReadinessPoller<P> {
    probe: P,
    prefix: String,
    interval: Duration,
}

impl<P: InterfaceProbe> ReadinessPoller<P> {
    /// Create a poller for interfaces starting with `prefix`
    #[must_use]
    pub fn new(probe: P, prefix: impl Into<String>, interval: Duration) -> Self {
        Self {
            probe,
            prefix: prefix.into(),
            interval,
        }
    }

    /// Create a poller using the prefix and interval from `config`
    #[must_use]
    pub fn from_config(probe: P, config: &LaunchConfig) -> Self {
        Self::new(probe, config.veth_prefix.clone(), config.poll_interval)
    }

    /// Get the probe
    #[must_use]
    pub const fn probe(&self) -> &P {
        &self.probe
    }

    /// Whether `token` names an interface this poller waits for
    #[must_use]
    pub fn is_managed(&self, token: &str) -> bool {
        token.starts_with(&self.prefix)
    }

    /// Wait for every managed interface in `raw`
    ///
    /// `raw` is a `;`-separated list; `None` or an empty string returns
    /// immediately without querying anything. Returns the interfaces that
    /// were waited on, in order.
    pub async fn wait_for_interfaces(&self, raw: Option<&str>) -> Result<Vec<InterfaceName>> {
        let Some(raw) = raw.filter(|r| !r.is_empty()) else {
            debug!("No interfaces to wait for");
            return Ok(Vec::new());
        };

        let mut ready = Vec::new();

        for token in raw.split(INTERFACE_DELIMITER) {
            if !self.is_managed(token) {
                trace!(token, "Skipping unmanaged interface");
                continue;
            }

            let name = InterfaceName::new(token)?;
            self.wait_for(&name).await?;
            ready.push(name);
        }

        Ok(ready)
    }

    /// Poll `name` until it reports up, sleeping `interval` between polls
    pub async fn wait_for(&self, name: &InterfaceName) -> Result<()> {
        info!(interface = %name, "Waiting for interface");

        let mut polls: u64 = 1;
        while !self.probe.is_up(name).await? {
            thread::sleep(self.interval);
            polls += 1;
        }

        info!(interface = %name, polls, "Interface up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockProbe;
    use nix::errno::Errno;
    use vethgate_core::Error;

    fn poller(probe: MockProbe) -> ReadinessPoller<MockProbe> {
        ReadinessPoller::new(probe, "vnbe", Duration::from_micros(500))
    }

    #[tokio::test]
    async fn test_absent_or_empty_list_issues_no_queries() {
        let poller = poller(MockProbe::new());

        assert!(poller.wait_for_interfaces(None).await.unwrap().is_empty());
        assert!(poller.wait_for_interfaces(Some("")).await.unwrap().is_empty());
        assert!(poller.probe().queries().await.is_empty());
    }

    #[tokio::test]
    async fn test_unmanaged_tokens_are_never_queried() {
        let poller = poller(MockProbe::new());

        let ready = poller
            .wait_for_interfaces(Some("eth0;lo;;veth1"))
            .await
            .unwrap();

        assert!(ready.is_empty());
        assert!(poller.probe().queries().await.is_empty());
    }

    #[tokio::test]
    async fn test_waits_in_list_order() {
        let probe = MockProbe::new();
        probe.up_after("vnbe0", 3).await;
        // vnbe1 is up from the start but must still be checked after vnbe0
        probe.up_after("vnbe1", 0).await;
        let poller = poller(probe);

        let ready = poller
            .wait_for_interfaces(Some("vnbe0;other1;vnbe1"))
            .await
            .unwrap();

        assert_eq!(
            ready.iter().map(InterfaceName::as_str).collect::<Vec<_>>(),
            vec!["vnbe0", "vnbe1"]
        );
        assert_eq!(
            poller.probe().queries().await,
            vec!["vnbe0", "vnbe0", "vnbe0", "vnbe0", "vnbe1"]
        );
    }

    #[tokio::test]
    async fn test_sleeps_between_polls() {
        let probe = MockProbe::new();
        probe.up_after("vnbe0", 4).await;
        let poller = poller(probe);

        let start = std::time::Instant::now();
        poller.wait_for_interfaces(Some("vnbe0")).await.unwrap();

        // Four down polls, four sleeps
        assert!(start.elapsed() >= Duration::from_micros(2000));
        assert_eq!(poller.probe().query_count("vnbe0").await, 5);
    }

    #[tokio::test]
    async fn test_sub_millisecond_interval_is_honoured() {
        let probe = MockProbe::new();
        probe.up_after("vnbe0", 200).await;
        let poller = poller(probe);

        let start = std::time::Instant::now();
        poller.wait_for_interfaces(Some("vnbe0")).await.unwrap();
        let per_poll = start.elapsed() / 200;

        assert!(per_poll >= Duration::from_micros(500));
        assert!(
            per_poll < Duration::from_millis(1),
            "500us interval took {per_poll:?} per poll"
        );
    }

    #[tokio::test]
    async fn test_query_failure_aborts_wait() {
        let probe = MockProbe::new();
        probe.fail("vnbe0", Errno::EPERM).await;
        probe.up_after("vnbe1", 0).await;
        let poller = poller(probe);

        let result = poller.wait_for_interfaces(Some("vnbe0;vnbe1")).await;

        assert!(matches!(
            result,
            Err(Error::InterfaceQuery {
                source: Errno::EPERM,
                ..
            })
        ));
        // Failure is not retried and later interfaces are not touched
        assert_eq!(poller.probe().queries().await, vec!["vnbe0"]);
    }

    #[tokio::test]
    async fn test_missing_interface_is_fatal() {
        let poller = poller(MockProbe::new());
        let result = poller.wait_for_interfaces(Some("vnbe7")).await;

        assert!(matches!(result, Err(Error::InterfaceQuery { .. })));
        assert_eq!(poller.probe().query_count("vnbe7").await, 1);
    }

    #[tokio::test]
    async fn test_bare_prefix_is_managed() {
        let probe = MockProbe::new();
        probe.up_after("vnbe", 0).await;
        let poller = poller(probe);

        let ready = poller.wait_for_interfaces(Some("vnbe")).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert!(!poller.is_managed("vnb"));
    }

    #[tokio::test]
    async fn test_oversized_name_is_rejected() {
        let poller = poller(MockProbe::new());
        let result = poller
            .wait_for_interfaces(Some("vnbe0123456789abcdef"))
            .await;

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
        assert!(poller.probe().queries().await.is_empty());
    }
}
