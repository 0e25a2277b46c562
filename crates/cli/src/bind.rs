use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;

/// Where `serve-http` may listen
///
/// The graph API has no authentication, so only loopback addresses are
/// allowed unless the operator opted into public exposure.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BindPolicy {
    allow_public: bool,
}

impl BindPolicy {
    pub(crate) fn new(allow_public: bool) -> Self {
        Self { allow_public }
    }

    /// Resolve `bind` to the single address the server listens on
    ///
    /// Every resolved address must pass the policy; IPv4 wins when the name
    /// resolves to both families.
    pub(crate) async fn listen_addr(&self, bind: &str) -> Result<SocketAddr> {
        let candidates: Vec<SocketAddr> = tokio::net::lookup_host(bind)
            .await
            .with_context(|| format!("Cannot resolve --bind {bind}"))?
            .collect();

        self.check(bind, &candidates)?;

        candidates
            .iter()
            .copied()
            .min_by_key(SocketAddr::is_ipv6)
            .with_context(|| format!("--bind {bind} resolved to no addresses"))
    }

    fn check(&self, bind: &str, candidates: &[SocketAddr]) -> Result<()> {
        if self.allow_public {
            return Ok(());
        }
        if let Some(exposed) = candidates.iter().find(|addr| !addr.ip().is_loopback()) {
            anyhow::bail!(
                "Refusing to serve the graph API on {exposed} (from --bind {bind}) without --public"
            );
        }
        Ok(())
    }
}
