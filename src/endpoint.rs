use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

/// A destination answer candidate with a configured weight and a
/// running selection counter.
#[derive(Debug)]
pub struct Endpoint {
    pub name: String,
    pub weight: u32,
    pub address: Ipv4Addr,
    exec_times: AtomicU64,
}

impl Endpoint {
    pub fn new(name: String, weight: u32, address: Ipv4Addr) -> Self {
        Self {
            name,
            weight,
            address,
            exec_times: AtomicU64::new(0),
        }
    }

    pub fn exec_times(&self) -> u64 {
        self.exec_times.load(Ordering::Relaxed)
    }
}

/// An ordered set of endpoints answering the same diversion.
#[derive(Debug, Default)]
pub struct RecordA {
    pub endpoints: Vec<Endpoint>,
}

impl RecordA {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    /// Weighted round robin: pick the endpoint with the lowest
    /// `exec_times / weight`, later position wins ties, then bump its
    /// counter. Empty record selects nothing.
    pub fn select(&self) -> Option<&Endpoint> {
        let mut chosen: Option<&Endpoint> = None;
        let mut min_score = f64::INFINITY;

        for ep in &self.endpoints {
            let score = ep.exec_times() as f64 / ep.weight as f64;
            if chosen.is_none() || score <= min_score {
                chosen = Some(ep);
                min_score = score;
            }
        }

        if let Some(ep) = chosen {
            ep.exec_times.fetch_add(1, Ordering::Relaxed);
        }
        chosen
    }
}
