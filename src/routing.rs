//! Zone routing: decide which configured zone owns each URL.

use tracing::debug;
use url::Url;

use crate::config::ZoneRegistry;

/// Group URLs by the zone of the configured domain they belong to.
///
/// A URL like `https://www-intranet.example.com/page` belongs to the zone
/// configured for `example.com`: the configured domain must appear in the
/// URL's host on a dot boundary, so `evilexample.com` never matches
/// `example.com`. URLs matching no configured domain are dropped without
/// error. When configured domains overlap (`example.com` and
/// `api.example.com`), a URL lands in every matching zone's group, once per
/// zone. Group order follows the registry, URL order follows the input.
pub fn group_urls_by_zones(
    urls: &[String],
    registry: &ZoneRegistry,
) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for entry in registry.entries() {
        let matching: Vec<String> = urls
            .iter()
            .filter(|url| host_matches_domain(url.as_str(), &entry.domain))
            .cloned()
            .collect();
        if matching.is_empty() {
            continue;
        }
        match groups
            .iter_mut()
            .find(|(zone_id, _)| *zone_id == entry.zone_id)
        {
            // two domains can share a zone; keep each URL once per zone
            Some((_, group)) => {
                for url in matching {
                    if !group.contains(&url) {
                        group.push(url);
                    }
                }
            }
            None => groups.push((entry.zone_id.clone(), matching)),
        }
    }

    let dropped = urls
        .iter()
        .filter(|url| !groups.iter().any(|(_, group)| group.contains(*url)))
        .count();
    if dropped > 0 {
        debug!(dropped, "skipped URLs outside every configured zone");
    }

    groups
}

/// Dot-boundary match between a URL's host and a configured domain: with a
/// dot prepended to each, the domain must be a substring of the host. A URL
/// that does not parse, or has no host, matches nothing.
fn host_matches_domain(url: &str, domain: &str) -> bool {
    let host = match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        },
        Err(_) => return false,
    };
    format!(".{host}").contains(&format!(".{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|url| url.to_string()).collect()
    }

    #[test]
    fn subdomain_matches_configured_domain() {
        let registry = ZoneRegistry::from_pairs([("example.com", "Z1")]).unwrap();
        let grouped = group_urls_by_zones(
            &urls(&[
                "https://www.example.com/a",
                "https://intranet.example.com/b",
                "https://example.com/c",
            ]),
            &registry,
        );
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].0, "Z1");
        assert_eq!(grouped[0].1.len(), 3);
    }

    #[test]
    fn lookalike_domain_is_rejected() {
        let registry = ZoneRegistry::from_pairs([("example.com", "Z1")]).unwrap();
        let grouped = group_urls_by_zones(&urls(&["https://evilexample.com/a"]), &registry);
        assert!(grouped.is_empty());
    }

    #[test]
    fn unmatched_urls_are_dropped() {
        let registry = ZoneRegistry::from_pairs([("example.com", "Z1")]).unwrap();
        let input = urls(&[
            "https://www.example.com/a",
            "https://unrelated.net/b",
            "https://other.org/c",
        ]);
        let grouped = group_urls_by_zones(&input, &registry);
        let matched: usize = grouped.iter().map(|(_, group)| group.len()).sum();
        assert_eq!(matched, 1);
    }

    #[test]
    fn overlapping_domains_each_receive_the_url() {
        let registry =
            ZoneRegistry::from_pairs([("example.com", "Z1"), ("api.example.com", "Z2")]).unwrap();
        let grouped = group_urls_by_zones(&urls(&["https://api.example.com/v1"]), &registry);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0], ("Z1".to_string(), urls(&["https://api.example.com/v1"])));
        assert_eq!(grouped[1], ("Z2".to_string(), urls(&["https://api.example.com/v1"])));
    }

    #[test]
    fn malformed_urls_are_dropped() {
        let registry = ZoneRegistry::from_pairs([("example.com", "Z1")]).unwrap();
        let grouped = group_urls_by_zones(
            &urls(&["not a url", "https://", "/relative/path", "https://example.com/ok"]),
            &registry,
        );
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].1, urls(&["https://example.com/ok"]));
    }

    #[test]
    fn empty_registry_yields_no_groups() {
        let grouped = group_urls_by_zones(&urls(&["https://example.com/a"]), &ZoneRegistry::new());
        assert!(grouped.is_empty());
    }

    #[test]
    fn input_order_is_preserved_within_a_group() {
        let registry = ZoneRegistry::from_pairs([("example.com", "Z1")]).unwrap();
        let input = urls(&[
            "https://example.com/3",
            "https://example.com/1",
            "https://example.com/2",
        ]);
        let grouped = group_urls_by_zones(&input, &registry);
        assert_eq!(grouped[0].1, input);
    }

    #[test]
    fn domains_sharing_a_zone_merge_without_duplicates() {
        let registry =
            ZoneRegistry::from_pairs([("example.com", "Z1"), ("www.example.com", "Z1")]).unwrap();
        let grouped = group_urls_by_zones(
            &urls(&["https://www.example.com/a", "https://example.com/b"]),
            &registry,
        );
        assert_eq!(grouped.len(), 1);
        assert_eq!(
            grouped[0].1,
            urls(&["https://www.example.com/a", "https://example.com/b"])
        );
    }

    #[test]
    fn host_matching_is_case_insensitive() {
        let registry = ZoneRegistry::from_pairs([("Example.COM", "Z1")]).unwrap();
        let grouped = group_urls_by_zones(&urls(&["https://WWW.EXAMPLE.COM/a"]), &registry);
        assert_eq!(grouped.len(), 1);
    }
}
