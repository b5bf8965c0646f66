use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::endpoint::RecordA;

/// A `Diversion.source` resolves once, at load time, to exactly one of
/// these kinds.
#[derive(Debug, Clone)]
pub enum DiversionKind {
    Exact(Ipv4Addr),
    Network(Ipv4Net),
}

/// A source-address routing rule attached to a domain node.
#[derive(Debug)]
pub struct Diversion {
    pub source: String,
    pub kind: DiversionKind,
    pub name: String,
    pub a: RecordA,
}

/// Parses a `Diversion.source` string as either a bare IPv4 address or
/// a CIDR network. `None` means neither parsed.
pub fn parse_source(source: &str) -> Option<DiversionKind> {
    if let Ok(ip) = source.parse::<Ipv4Addr>() {
        return Some(DiversionKind::Exact(ip));
    }
    if let Ok(net) = source.parse::<Ipv4Net>() {
        return Some(DiversionKind::Network(net));
    }
    None
}

/// Exact match wins outright; otherwise the network rule with the
/// largest prefix length wins, later position breaking ties.
pub fn best_match(diversions: &[Diversion], client: Ipv4Addr) -> Option<&Diversion> {
    for d in diversions {
        if let DiversionKind::Exact(ip) = d.kind {
            if ip == client {
                return Some(d);
            }
        }
    }

    let mut best: Option<&Diversion> = None;
    let mut best_prefix: i32 = -1;
    for d in diversions {
        if let DiversionKind::Network(net) = &d.kind {
            if net.contains(&client) {
                let prefix = net.prefix_len() as i32;
                if prefix >= best_prefix {
                    best = Some(d);
                    best_prefix = prefix;
                }
            }
        }
    }
    best
}
