//! Region code → dispatch endpoint resolution.

/// Used when no override is configured and the region is unmapped.
pub const DEFAULT_ENDPOINT: &str = "bob-dispatch-prod-eu.amazon.com";

const NA_ENDPOINT: &str = "bob-dispatch-prod-na.amazon.com";
const FE_ENDPOINT: &str = "bob-dispatch-prod-fe.amazon.com";

/// Static fallback table.  Any region not listed here resolves to
/// [`DEFAULT_ENDPOINT`].
pub const REGION_ENDPOINTS: &[(&str, &str)] = &[
    ("amazon.com", NA_ENDPOINT),
    ("amazon.ca", NA_ENDPOINT),
    ("amazon.com.mx", NA_ENDPOINT),
    ("amazon.com.br", NA_ENDPOINT),
    ("amazon.co.jp", FE_ENDPOINT),
    ("amazon.com.au", FE_ENDPOINT),
    ("amazon.com.in", FE_ENDPOINT),
    ("amazon.co.nz", FE_ENDPOINT),
];

/// Pick the host to dial.  An explicit override always wins.
pub fn resolve_endpoint(endpoint_override: Option<&str>, region: Option<&str>) -> String {
    if let Some(host) = endpoint_override.map(str::trim).filter(|h| !h.is_empty()) {
        return host.to_string();
    }
    region
        .and_then(|code| {
            REGION_ENDPOINTS
                .iter()
                .find(|(r, _)| *r == code)
                .map(|(_, host)| *host)
        })
        .unwrap_or(DEFAULT_ENDPOINT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mapped_region_resolves_to_its_table_entry() {
        for (region, host) in REGION_ENDPOINTS {
            assert_eq!(resolve_endpoint(None, Some(region)), *host, "{region}");
        }
    }

    #[test]
    fn north_america_and_far_east_groups() {
        assert_eq!(
            resolve_endpoint(None, Some("amazon.com.br")),
            "bob-dispatch-prod-na.amazon.com"
        );
        assert_eq!(
            resolve_endpoint(None, Some("amazon.co.nz")),
            "bob-dispatch-prod-fe.amazon.com"
        );
    }

    #[test]
    fn unmapped_region_uses_default() {
        assert_eq!(resolve_endpoint(None, Some("amazon.de")), DEFAULT_ENDPOINT);
        assert_eq!(resolve_endpoint(None, Some("")), DEFAULT_ENDPOINT);
        assert_eq!(resolve_endpoint(None, None), DEFAULT_ENDPOINT);
    }

    #[test]
    fn override_always_wins() {
        assert_eq!(
            resolve_endpoint(Some("push.example.net"), Some("amazon.com")),
            "push.example.net"
        );
        assert_eq!(resolve_endpoint(Some("push.example.net"), None), "push.example.net");
    }

    #[test]
    fn blank_override_is_ignored() {
        assert_eq!(
            resolve_endpoint(Some("  "), Some("amazon.co.jp")),
            "bob-dispatch-prod-fe.amazon.com"
        );
    }
}
