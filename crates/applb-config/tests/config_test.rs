#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::net::Ipv4Addr;

use applb_config::{ConfigError, build_cluster, load_config};
use applb_core::ports::{AddressPool, CapabilityOracle, NetworkDirectory};
use applb_core::{AccountId, Capability, NetworkId, Service, TrafficType};
use tempfile::NamedTempFile;

const SAMPLE: &str = r#"
[manager]
force_detach_on_delete = false

[[networks]]
id = 1
name = "guest"
cidr = "10.1.1.0/24"
gateway = "10.1.1.1"
services = ["Lb", "Firewall"]

[networks.capabilities]
SupportedProtocols = "tcp"
SupportedLbAlgorithms = "roundrobin,leastconn,source"

[[networks]]
id = 3
name = "public"
traffic_type = "Public"

[[accounts]]
id = 1
name = "admin"
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_sections_from_file() {
    let file = write_config(SAMPLE);
    let config = load_config(Some(file.path())).unwrap();

    assert!(!config.manager.force_detach_on_delete);
    assert!(config.manager.usage_events);
    assert_eq!(config.networks.len(), 2);
    assert_eq!(config.networks[1].traffic_type, "Public");
    assert_eq!(config.networks[0].traffic_type, "Guest");
    assert_eq!(config.accounts[0].name, "admin");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn malformed_toml_is_a_loading_error() {
    let file = write_config("[[networks]]\nid = \"one\"\n");
    assert!(matches!(
        load_config(Some(file.path())),
        Err(ConfigError::Figment(_))
    ));
}

#[test]
fn cluster_reflects_config() {
    let file = write_config(SAMPLE);
    let config = load_config(Some(file.path())).unwrap();
    let cluster = build_cluster(&config).unwrap();

    let guest = cluster.networks.resolve(NetworkId::new(1)).unwrap();
    assert_eq!(guest.traffic_type, TrafficType::Guest);
    assert!(cluster.networks.supports_service(NetworkId::new(1), Service::Lb));
    assert!(
        cluster
            .networks
            .capabilities(NetworkId::new(1), Service::Lb)
            .lists(Capability::SupportedLbAlgorithms, "source")
    );
    assert!(cluster.accounts.name(AccountId::new(1)).is_some());

    // The gateway is never handed out.
    assert_eq!(
        cluster.networks.allocate(NetworkId::new(1)).unwrap(),
        Ipv4Addr::new(10, 1, 1, 2)
    );
}
