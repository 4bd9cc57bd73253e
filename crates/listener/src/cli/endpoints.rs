use pw_channel::endpoint::{resolve_endpoint, DEFAULT_ENDPOINT, REGION_ENDPOINTS};
use pw_domain::config::ChannelConfig;

/// Region table plus the endpoint the `[channel]` section resolves to.
pub fn render(channel: &ChannelConfig) -> String {
    let mut out = String::new();
    for (region, host) in REGION_ENDPOINTS {
        out.push_str(&format!("{region:<16} {host}\n"));
    }
    out.push_str(&format!("{:<16} {DEFAULT_ENDPOINT}\n", "(default)"));

    let resolved = resolve_endpoint(channel.endpoint_override.as_deref(), channel.region.as_deref());
    let source = if channel
        .endpoint_override
        .as_deref()
        .is_some_and(|h| !h.trim().is_empty())
    {
        "endpoint_override"
    } else {
        "region"
    };
    out.push_str(&format!("\nresolved: {resolved} (from {source})\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shows_table_and_resolution() {
        let channel = ChannelConfig {
            region: Some("amazon.ca".into()),
            ..Default::default()
        };
        let out = render(&channel);
        assert!(out.contains("amazon.com.br"));
        assert!(out.contains("resolved: bob-dispatch-prod-na.amazon.com (from region)"));
    }

    #[test]
    fn override_is_reported_as_source() {
        let channel = ChannelConfig {
            endpoint_override: Some("push.example.net".into()),
            ..Default::default()
        };
        assert!(render(&channel).contains("resolved: push.example.net (from endpoint_override)"));
    }
}
