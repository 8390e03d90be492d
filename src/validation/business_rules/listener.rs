use std::collections::BTreeMap;

use crate::model::{ListenerType, MatchedListenerType, Proxy, TcpListener};
use crate::validation::report::{
    ListenerErrorKind, ProxyReport, TcpHostErrorKind, TcpListenerReport,
};

/// Proxy-wide listener checks: unique names, unique bind ports, a usable
/// address/port pair and unique TCP host names inside each TCP listener.
pub fn validate_listeners(proxy: &Proxy, report: &mut ProxyReport) {
    let mut names: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    let mut ports: BTreeMap<u32, Vec<usize>> = BTreeMap::new();

    for (index, listener) in proxy.listeners.iter().enumerate() {
        names.entry(listener.name.as_str()).or_default().push(index);
        ports.entry(listener.bind_port).or_default().push(index);

        if let Err(message) = validate_listener_address_port(&listener.bind_address, listener.bind_port)
        {
            report.listener_report_mut(index).add_error(ListenerErrorKind::Processing, message);
        }
    }

    for (name, indexes) in names.into_iter().filter(|(_, indexes)| indexes.len() > 1) {
        for index in indexes {
            report.listener_report_mut(index).add_error(
                ListenerErrorKind::NameNotUnique,
                format!("listener name {name} is not unique in proxy {}", proxy.name),
            );
        }
    }

    for (port, indexes) in ports.into_iter().filter(|(_, indexes)| indexes.len() > 1) {
        let listeners: Vec<&str> =
            indexes.iter().map(|&index| proxy.listeners[index].name.as_str()).collect();
        let message =
            format!("bind port {port} is shared by the following listeners: [{}]", listeners.join(", "));
        for index in indexes {
            report
                .listener_report_mut(index)
                .add_error(ListenerErrorKind::BindPortNotUnique, message.clone());
        }
    }

    for (index, listener) in proxy.listeners.iter().enumerate() {
        let listener_report = report.listener_report_mut(index);
        match &listener.listener_type {
            ListenerType::Tcp(tcp) => {
                if let Some(tcp_report) = listener_report.tcp_mut() {
                    validate_tcp_host_names(tcp, tcp_report);
                }
            }
            ListenerType::Hybrid(hybrid) => {
                let Some(hybrid_report) = listener_report.hybrid_mut() else {
                    continue;
                };
                for (matched_index, matched) in hybrid.matched_listeners.iter().enumerate() {
                    if let MatchedListenerType::Tcp(tcp) = &matched.listener_type {
                        if let Some(tcp_report) = hybrid_report.tcp_mut(matched_index) {
                            validate_tcp_host_names(tcp, tcp_report);
                        }
                    }
                }
            }
            ListenerType::Http(_) => {}
        }
    }
}

/// Every TCP host of a listener must have a distinct name
pub fn validate_tcp_host_names(listener: &TcpListener, report: &mut TcpListenerReport) {
    let mut names: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, host) in listener.tcp_hosts.iter().enumerate() {
        names.entry(host.name.as_str()).or_default().push(index);
    }
    for (name, indexes) in names.into_iter().filter(|(_, indexes)| indexes.len() > 1) {
        for index in indexes {
            report.tcp_host_report_mut(index).add_error(
                TcpHostErrorKind::NameNotUnique,
                format!("tcp host name {name} is not unique"),
            );
        }
    }
}

/// Validate listener port and address constraints
fn validate_listener_address_port(address: &str, port: u32) -> Result<(), String> {
    if address.is_empty() {
        return Err("listener bind address cannot be empty".to_string());
    }
    if port == 0 || port > 65535 {
        return Err(format!("listener bind port {port} must be between 1 and 65535"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpListener, Listener, TcpHost};

    fn http(name: &str, port: u32) -> Listener {
        Listener::new(name, "::", port, ListenerType::Http(HttpListener::default()))
    }

    fn tcp_host(name: &str) -> TcpHost {
        TcpHost { name: name.into(), ssl_config: None, destination: None }
    }

    #[test]
    fn duplicate_names_and_ports_are_reported() {
        let proxy = Proxy {
            name: "gateway-proxy".into(),
            namespace: "ns".into(),
            listeners: vec![http("a", 8080), http("a", 8081), http("b", 8080)],
        };
        let mut report = ProxyReport::for_proxy(&proxy);
        validate_listeners(&proxy, &mut report);

        let kinds = |index: usize| -> Vec<ListenerErrorKind> {
            report.listener_reports[index].errors.iter().map(|e| e.kind).collect()
        };
        assert_eq!(
            kinds(0),
            vec![ListenerErrorKind::NameNotUnique, ListenerErrorKind::BindPortNotUnique]
        );
        assert_eq!(kinds(1), vec![ListenerErrorKind::NameNotUnique]);
        assert_eq!(kinds(2), vec![ListenerErrorKind::BindPortNotUnique]);
        assert_eq!(
            report.listener_reports[2].errors[0].message,
            "bind port 8080 is shared by the following listeners: [a, b]"
        );
    }

    #[test]
    fn invalid_bind_port_is_a_processing_error() {
        let proxy = Proxy {
            name: "p".into(),
            namespace: String::new(),
            listeners: vec![http("a", 70000)],
        };
        let mut report = ProxyReport::for_proxy(&proxy);
        validate_listeners(&proxy, &mut report);
        assert_eq!(report.listener_reports[0].errors[0].kind, ListenerErrorKind::Processing);
    }

    #[test]
    fn duplicate_tcp_host_names() {
        let listener = TcpListener {
            tcp_hosts: vec![tcp_host("db"), tcp_host("cache"), tcp_host("db")],
            stat_prefix: String::new(),
        };
        let mut report = TcpListenerReport::for_listener(&listener);
        validate_tcp_host_names(&listener, &mut report);
        assert_eq!(report.tcp_host_reports[0].errors.len(), 1);
        assert!(report.tcp_host_reports[1].errors.is_empty());
        assert_eq!(report.tcp_host_reports[2].errors[0].kind, TcpHostErrorKind::NameNotUnique);
    }
}
