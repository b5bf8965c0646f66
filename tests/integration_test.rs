use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{DNSClass, Name, RecordType};
use hickory_client::udp::UdpClientStream;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use traffic_dns::config;
use traffic_dns::server::DnsServer;

const FIXTURE: &str = r#"
dns:
  - domain: vu
    parent: "."
  - domain: vk.vu
    parent: vu
  - domain: r.vk.vu
    parent: vk.vu
    diversion:
      - source: 0.0.0.0/0
        name: default
        a:
          endpoints:
            - name: ep1
              weight: 3
              address: 10.221.2.12
            - name: ep2
              weight: 1
              address: 10.221.2.13
            - name: ep3
              weight: 6
              address: 10.221.2.14
"#;

async fn spawn_test_server(yaml: &str) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let cfg = config::load_from_str(yaml).unwrap();
    let server = DnsServer::new(Arc::new(cfg), addr, 600);

    tokio::spawn(async move {
        server.run().await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    addr
}

async fn connect(addr: SocketAddr) -> AsyncClient {
    let stream = UdpClientStream::<tokio::net::UdpSocket>::new(addr);
    let (client, bg) = AsyncClient::connect(stream).await.unwrap();
    tokio::spawn(bg);
    client
}

#[tokio::test]
async fn answers_a_query_with_configured_ttl_and_an_endpoint() {
    let addr = spawn_test_server(FIXTURE).await;
    let mut client = connect(addr).await;

    let name = Name::from_str("r.vk.vu").unwrap();
    let response = client
        .query(name, DNSClass::IN, RecordType::A)
        .await
        .unwrap();

    let answers = response.answers();
    assert_eq!(answers.len(), 1, "expected exactly one answer");

    let record = &answers[0];
    assert_eq!(record.ttl(), 600);

    let ip = record.data().unwrap().as_a().unwrap().0;
    let known = [
        Ipv4Addr::new(10, 221, 2, 12),
        Ipv4Addr::new(10, 221, 2, 13),
        Ipv4Addr::new(10, 221, 2, 14),
    ];
    assert!(known.contains(&ip), "unexpected answer ip {ip}");
}

#[tokio::test]
async fn unknown_domain_yields_servfail() {
    let addr = spawn_test_server(FIXTURE).await;
    let mut client = connect(addr).await;

    let name = Name::from_str("nowhere.example").unwrap();
    let response = client
        .query(name, DNSClass::IN, RecordType::A)
        .await
        .unwrap();

    assert_eq!(response.response_code(), ResponseCode::ServFail);
    assert!(response.answers().is_empty());
}

#[tokio::test]
async fn node_with_no_diversions_yields_servfail() {
    let addr = spawn_test_server(FIXTURE).await;
    let mut client = connect(addr).await;

    let name = Name::from_str("vk.vu").unwrap();
    let response = client
        .query(name, DNSClass::IN, RecordType::A)
        .await
        .unwrap();

    assert_eq!(response.response_code(), ResponseCode::ServFail);
}

#[tokio::test]
async fn repeated_queries_distribute_by_weight() {
    let addr = spawn_test_server(FIXTURE).await;
    let mut client = connect(addr).await;

    let n = 2_000;
    let mut counts = [0u32; 3];
    for _ in 0..n {
        let name = Name::from_str("r.vk.vu").unwrap();
        let response = client
            .query(name, DNSClass::IN, RecordType::A)
            .await
            .unwrap();
        let ip = response.answers()[0].data().unwrap().as_a().unwrap().0;
        match ip.octets()[3] {
            12 => counts[0] += 1,
            13 => counts[1] += 1,
            14 => counts[2] += 1,
            _ => unreachable!(),
        }
    }

    let total_weight = 10.0;
    let expected = [3.0 / total_weight, 1.0 / total_weight, 6.0 / total_weight];
    for (count, expected_share) in counts.iter().zip(expected) {
        let share = *count as f64 / n as f64;
        assert!(
            (share - expected_share).abs() < 0.05,
            "share {share} too far from expected {expected_share}"
        );
    }
}
