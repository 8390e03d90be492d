use std::collections::BTreeMap;

use crate::model::VirtualHost;
use crate::validation::report::{HttpListenerReport, VirtualHostErrorKind};

/// Domain every virtual host without explicit domains answers for
pub const WILDCARD_DOMAIN: &str = "*";

/// Check that no domain is claimed by more than one virtual host of a listener.
///
/// A virtual host without domains claims the wildcard domain. Every virtual host
/// sharing a domain gets a `DomainsNotUniqueError`; empty domain strings get an
/// `EmptyDomainError`. Nothing here stops the listener from being translated.
pub fn validate_virtual_host_domains(
    virtual_hosts: &[VirtualHost],
    report: &mut HttpListenerReport,
) {
    let mut domains_to_virtual_hosts: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for (index, vhost) in virtual_hosts.iter().enumerate() {
        if vhost.domains.is_empty() {
            domains_to_virtual_hosts.entry(WILDCARD_DOMAIN).or_default().push(index);
        }
        for domain in &vhost.domains {
            if domain.is_empty() {
                report.virtual_host_report_mut(index).add_error(
                    VirtualHostErrorKind::EmptyDomain,
                    format!("virtual host {} has an empty domain", vhost.name),
                );
            }
            domains_to_virtual_hosts.entry(domain.as_str()).or_default().push(index);
        }
    }

    for (domain, indexes) in domains_to_virtual_hosts {
        if indexes.len() < 2 {
            continue;
        }
        let names: Vec<&str> =
            indexes.iter().map(|&index| virtual_hosts[index].name.as_str()).collect();
        let message =
            format!("domain {domain} is shared by the following virtual hosts: [{}]", names.join(", "));
        for index in indexes {
            report
                .virtual_host_report_mut(index)
                .add_error(VirtualHostErrorKind::DomainsNotUnique, message.clone());
        }
    }
}
