//! Same-origin relay routing for cross-origin capability and feature requests.

use reqwest::Url;

use crate::error::{CloudError, Result};

/// How cross-origin requests reach their server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyRoute {
    /// Issue the request as-is.
    #[default]
    Direct,
    /// Wrap the target in `<relay>?url=<target>`.
    Relay(String),
}

impl ProxyRoute {
    pub fn from_config(proxy_url: Option<&str>) -> Self {
        match proxy_url.map(str::trim) {
            Some(url) if !url.is_empty() => Self::Relay(url.to_string()),
            _ => Self::Direct,
        }
    }

    /// The URL to actually request for `target`.
    pub fn route(&self, target: &str) -> Result<String> {
        let target_url = Url::parse(target).map_err(|e| CloudError::InvalidUrl {
            url: target.to_string(),
            reason: e.to_string(),
        })?;
        match self {
            Self::Direct => Ok(target_url.into()),
            Self::Relay(relay) => {
                let mut url = Url::parse(relay).map_err(|e| CloudError::InvalidUrl {
                    url: relay.clone(),
                    reason: e.to_string(),
                })?;
                url.query_pairs_mut().append_pair("url", target_url.as_str());
                Ok(url.into())
            }
        }
    }
}
