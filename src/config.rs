use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::diversion::{parse_source, Diversion};
use crate::domain_tree::{leftmost_label, Config, DomainNode};
use crate::endpoint::{Endpoint, RecordA};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("diversion '{name}' has unparseable source '{source}'")]
    InvalidSource { source: String, name: String },
    #[error("endpoint '{endpoint}' has invalid weight {weight} (must be >= 1)")]
    InvalidWeight { endpoint: String, weight: u32 },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    dns: Vec<RawDnsNode>,
}

#[derive(Debug, Deserialize)]
pub struct RawDnsNode {
    pub domain: String,
    pub parent: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub diversion: Vec<RawDiversion>,
}

#[derive(Debug, Deserialize)]
pub struct RawDiversion {
    pub source: String,
    pub name: String,
    pub a: RawRecordA,
}

#[derive(Debug, Deserialize)]
pub struct RawRecordA {
    pub endpoints: Vec<RawEndpoint>,
}

#[derive(Debug, Deserialize)]
pub struct RawEndpoint {
    pub name: String,
    pub weight: u32,
    pub address: Ipv4Addr,
}

/// Reads and materializes the YAML config at `path` into a fully
/// linked, read-only [`Config`].
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    load_from_str(&text)
}

pub fn load_from_str(yaml: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(yaml)?;
    build_config(raw.dns)
}

/// Links a flat list of raw nodes into a tree rooted at a synthetic
/// base node, parsing every diversion's `source` along the way.
/// Nodes whose declared `parent` cannot be found are logged and
/// dropped (soft failure); a bad `source` or non-positive `weight` is
/// fatal.
pub fn build_config(raw_nodes: Vec<RawDnsNode>) -> Result<Config, ConfigError> {
    let domains: std::collections::HashSet<&str> =
        raw_nodes.iter().map(|n| n.domain.as_str()).collect();

    for n in &raw_nodes {
        if n.parent != "." && !domains.contains(n.parent.as_str()) {
            log::error!("can't find {}'s parent", n.domain);
        }
    }

    let mut children_of: HashMap<&str, Vec<&RawDnsNode>> = HashMap::new();
    for n in &raw_nodes {
        children_of.entry(n.parent.as_str()).or_default().push(n);
    }

    let mut all_nodes = Vec::new();
    let base_children = build_children(".", &children_of, &mut all_nodes)?;
    let base = Arc::new(DomainNode {
        domain: String::new(),
        diversions: Vec::new(),
        children: base_children,
    });

    Ok(Config {
        base,
        nodes: all_nodes,
    })
}

fn build_children(
    parent_key: &str,
    children_of: &HashMap<&str, Vec<&RawDnsNode>>,
    all_nodes: &mut Vec<Arc<DomainNode>>,
) -> Result<HashMap<String, Arc<DomainNode>>, ConfigError> {
    let mut map = HashMap::new();

    let Some(kids) = children_of.get(parent_key) else {
        return Ok(map);
    };

    for raw in kids {
        let children = build_children(raw.domain.as_str(), children_of, all_nodes)?;
        let diversions = raw
            .diversion
            .iter()
            .map(build_diversion)
            .collect::<Result<Vec<_>, _>>()?;

        let node = Arc::new(DomainNode {
            domain: raw.domain.clone(),
            diversions,
            children,
        });

        all_nodes.push(Arc::clone(&node));
        map.insert(leftmost_label(&raw.domain).to_string(), node);
    }

    Ok(map)
}

fn build_diversion(raw: &RawDiversion) -> Result<Diversion, ConfigError> {
    let kind = parse_source(&raw.source).ok_or_else(|| ConfigError::InvalidSource {
        source: raw.source.clone(),
        name: raw.name.clone(),
    })?;

    let mut endpoints = Vec::with_capacity(raw.a.endpoints.len());
    for e in &raw.a.endpoints {
        if e.weight < 1 {
            return Err(ConfigError::InvalidWeight {
                endpoint: e.name.clone(),
                weight: e.weight,
            });
        }
        endpoints.push(Endpoint::new(e.name.clone(), e.weight, e.address));
    }

    Ok(Diversion {
        source: raw.source.clone(),
        kind,
        name: raw.name.clone(),
        a: RecordA::new(endpoints),
    })
}
