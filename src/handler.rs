use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::proto::op::{Header, MessageType, ResponseCode};
use hickory_server::proto::rr::{RData, Record, RecordType};
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use log::{debug, warn};

use crate::diversion::best_match;
use crate::domain_tree::Config;

/// Answers `A` queries by walking the domain tree, diverting on the
/// client's source address, and picking a weighted endpoint. Any step
/// that comes up empty is refused with SERVFAIL.
pub struct TrafficHandler {
    config: Arc<Config>,
    ttl: u32,
}

impl TrafficHandler {
    pub fn new(config: Arc<Config>, ttl: u32) -> Self {
        Self { config, ttl }
    }

    fn client_ipv4(addr: IpAddr) -> Option<Ipv4Addr> {
        match addr {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        }
    }

    async fn handle_query<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let request_info = request.request_info();
        let query_name = request_info.query.name();
        let query_type = request_info.query.query_type();
        let domain = query_name
            .to_string()
            .trim_end_matches('.')
            .to_ascii_lowercase();

        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = Header::response_from_request(request_info.header);
        header.set_authoritative(true);

        let mut records: Vec<Record> = Vec::new();
        let rcode = match self.resolve_answer(
            &domain,
            query_type,
            request_info.src.ip(),
            query_name.clone().into(),
            &mut records,
        ) {
            Ok(()) => ResponseCode::NoError,
            Err(code) => code,
        };
        header.set_response_code(rcode);

        let response = builder.build(header, records.iter(), &[], &[], &[]);
        match response_handle.send_response(response).await {
            Ok(info) => info,
            Err(e) => {
                warn!("failed to send dns response: {e:#}");
                ResponseInfo::from(*request_info.header)
            }
        }
    }

    /// Runs the resolution pipeline, pushing any answer record into
    /// `records`. `Err` carries the SERVFAIL/other rcode to reply with.
    fn resolve_answer(
        &self,
        domain: &str,
        query_type: RecordType,
        client_addr: IpAddr,
        query_name: hickory_server::proto::rr::Name,
        records: &mut Vec<Record>,
    ) -> Result<(), ResponseCode> {
        if query_type != RecordType::A {
            debug!("refusing non-A query for {domain}: {query_type}");
            return Err(ResponseCode::ServFail);
        }

        let client_ip = Self::client_ipv4(client_addr).ok_or_else(|| {
            warn!("refusing query from non-ipv4 client {client_addr}");
            ResponseCode::ServFail
        })?;

        let node = self.config.base.resolve(domain).ok_or_else(|| {
            debug!("no domain tree match for {domain}");
            ResponseCode::ServFail
        })?;

        let diversion = best_match(&node.diversions, client_ip).ok_or_else(|| {
            debug!("no diversion match for {domain} from {client_ip}");
            ResponseCode::ServFail
        })?;

        let endpoint = diversion.a.select().ok_or_else(|| {
            warn!(
                "diversion '{}' for {domain} has no endpoints",
                diversion.name
            );
            ResponseCode::ServFail
        })?;

        debug!(
            "{domain} from {client_ip} -> {} via '{}'",
            endpoint.address, diversion.name
        );

        records.push(Record::from_rdata(
            query_name,
            self.ttl,
            RData::A(endpoint.address.into()),
        ));
        Ok(())
    }
}

#[async_trait]
impl RequestHandler for TrafficHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: R,
    ) -> ResponseInfo {
        match request.request_info().header.message_type() {
            MessageType::Query => self.handle_query(request, response_handle).await,
            MessageType::Response => {
                warn!("dropping unexpected response-type message");
                ResponseInfo::from(*request.request_info().header)
            }
        }
    }
}
