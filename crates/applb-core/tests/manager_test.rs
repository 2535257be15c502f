#![allow(clippy::unwrap_used)]

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;

use applb_core::store::{MemoryCluster, NetworkSpec};
use applb_core::{
    AccountId, Algorithm, CallContext, CoreError, CreateRuleRequest, ManagerConfig, NetworkId,
    RuleFilter, RuleId, RuleManager, RuleState, Scheme,
};
use pretty_assertions::assert_eq;

// ── Fixtures ────────────────────────────────────────────────────────

const GUEST: u64 = 1;
const PUBLIC: u64 = 3;

fn cluster() -> MemoryCluster {
    let cluster = MemoryCluster::new();
    cluster.add_network(NetworkSpec::guest(GUEST, "guest", "10.1.1.1/24").unwrap());
    cluster.add_network(NetworkSpec::public(PUBLIC, "public"));
    cluster.add_account(AccountId::new(1), "admin");
    cluster
}

fn manager(cluster: &MemoryCluster) -> RuleManager {
    cluster.manager(ManagerConfig::default())
}

fn alena() -> CreateRuleRequest {
    CreateRuleRequest {
        name: "alena".into(),
        description: "alena".into(),
        scheme: Scheme::Internal,
        source_ip_network_id: NetworkId::new(GUEST),
        source_ip: Some(Ipv4Addr::new(10, 1, 1, 1)),
        source_port: 22,
        instance_port: 22,
        algorithm: "roundrobin".into(),
        guest_network_id: NetworkId::new(GUEST),
        account_id: AccountId::new(1),
    }
}

fn ctx() -> CallContext {
    CallContext::system()
}

fn assert_nothing_persisted(cluster: &MemoryCluster) {
    assert!(cluster.rules.is_empty());
}

// ── Create ──────────────────────────────────────────────────────────

#[test]
fn create_returns_persisted_rule() {
    let cluster = cluster();
    let manager = manager(&cluster);

    let rule = manager.create(&alena(), &ctx()).unwrap();

    assert_eq!(rule.id, RuleId::new(1));
    assert_eq!(rule.state, RuleState::Add);
    assert_eq!(rule.algorithm, Algorithm::RoundRobin);
    assert_eq!(rule.source_ip, Ipv4Addr::new(10, 1, 1, 1));
    assert_eq!(manager.get(rule.id).unwrap(), rule);
}

#[test]
fn create_conflicts_with_existing_rule_on_same_endpoint() {
    let cluster = cluster();
    let manager = manager(&cluster);
    manager.create(&alena(), &ctx()).unwrap();

    let err = manager.create(&alena(), &ctx()).unwrap_err();

    assert_eq!(
        err,
        CoreError::RuleConflict {
            network_id: NetworkId::new(GUEST),
            source_ip: Ipv4Addr::new(10, 1, 1, 1),
            source_port: 22,
        }
    );
    assert_eq!(cluster.rules.len(), 1);
}

#[test]
fn create_rejects_source_port_out_of_range() {
    let cluster = cluster();
    let mut req = alena();
    req.source_port = 65536;

    let err = manager(&cluster).create(&req, &ctx()).unwrap_err();

    assert_eq!(err, CoreError::invalid_parameter("Invalid value for source port: 65536"));
    assert_nothing_persisted(&cluster);
}

#[test]
fn create_rejects_instance_port_out_of_range() {
    let cluster = cluster();
    let mut req = alena();
    req.instance_port = -1;

    let err = manager(&cluster).create(&req, &ctx()).unwrap_err();

    assert_eq!(err, CoreError::invalid_parameter("Invalid value for instance port: -1"));
    assert_nothing_persisted(&cluster);
}

#[test]
fn create_rejects_unknown_algorithm() {
    let cluster = cluster();
    let mut req = alena();
    req.algorithm = "invalidalgorithm".into();

    let err = manager(&cluster).create(&req, &ctx()).unwrap_err();

    assert_eq!(err, CoreError::invalid_parameter("Invalid algorithm: invalidalgorithm"));
    assert_nothing_persisted(&cluster);
}

#[test]
fn create_rejects_public_scheme() {
    let cluster = cluster();
    let mut req = alena();
    req.scheme = Scheme::Public;

    let err = manager(&cluster).create(&req, &ctx()).unwrap_err();

    assert_eq!(
        err,
        CoreError::unsupported_service("Only scheme of type Internal is supported")
    );
    assert_nothing_persisted(&cluster);
}

#[test]
fn create_rejects_public_source_network() {
    let cluster = cluster();
    let mut req = alena();
    req.source_ip_network_id = NetworkId::new(PUBLIC);

    let err = manager(&cluster).create(&req, &ctx()).unwrap_err();

    assert_eq!(err, CoreError::invalid_parameter("Only traffic type Guest is supported"));
    assert_nothing_persisted(&cluster);
}

#[test]
fn create_rejects_ip_outside_cidr() {
    let cluster = cluster();
    let mut req = alena();
    req.source_ip = Some(Ipv4Addr::new(10, 2, 1, 1));

    let err = manager(&cluster).create(&req, &ctx()).unwrap_err();

    assert_eq!(
        err,
        CoreError::invalid_parameter("The requested IP is not in the network's CIDR subnet.")
    );
    assert_nothing_persisted(&cluster);
}

#[test]
fn create_allocates_ip_when_none_requested() {
    let cluster = cluster();
    let manager = manager(&cluster);
    let mut req = alena();
    req.source_ip = None;

    let rule = manager.create(&req, &ctx()).unwrap();

    assert!(cluster.networks.is_in_use(NetworkId::new(GUEST), rule.source_ip));
    assert_eq!(rule.source_ip, Ipv4Addr::new(10, 1, 1, 1));
}

#[test]
fn firewall_refusal_leaves_no_partial_state() {
    let cluster = cluster();
    let manager = manager(&cluster);
    cluster.firewall.set_accepting(false);

    let err = manager.create(&alena(), &ctx()).unwrap_err();

    assert_eq!(
        err,
        CoreError::operation_failed("Unable to add lb rule for ip address 10.1.1.1")
    );
    assert_nothing_persisted(&cluster);
    assert!(!cluster.networks.is_in_use(NetworkId::new(GUEST), Ipv4Addr::new(10, 1, 1, 1)));
}

// ── Get ─────────────────────────────────────────────────────────────

#[test]
fn get_finds_existing_and_rejects_missing() {
    let cluster = cluster();
    let manager = manager(&cluster);
    manager.create(&alena(), &ctx()).unwrap();

    assert_eq!(manager.get(RuleId::new(1)).unwrap().name, "alena");
    assert_eq!(
        manager.get(RuleId::new(2)).unwrap_err(),
        CoreError::invalid_parameter("Unable to find load balancer rule by id 2")
    );
}

// ── Delete ──────────────────────────────────────────────────────────

#[test]
fn delete_existing_rule_removes_it() {
    let cluster = cluster();
    let manager = manager(&cluster);
    let rule = manager.create(&alena(), &ctx()).unwrap();

    assert!(manager.delete(rule.id, &ctx()).unwrap());

    assert!(manager.get(rule.id).is_err());
    assert!(manager.list(&RuleFilter::default()).is_empty());
    assert!(cluster.firewall.state(rule.id).is_none());
}

#[test]
fn delete_missing_rule_is_invalid_parameter() {
    let cluster = cluster();
    let err = manager(&cluster).delete(RuleId::new(42), &ctx()).unwrap_err();
    assert_eq!(
        err,
        CoreError::invalid_parameter("Unable to find load balancer rule by id 42")
    );
}

#[test]
fn second_delete_fails_as_not_found() {
    let cluster = cluster();
    let manager = manager(&cluster);
    let rule = manager.create(&alena(), &ctx()).unwrap();

    assert!(manager.delete(rule.id, &ctx()).unwrap());
    assert!(matches!(
        manager.delete(rule.id, &ctx()),
        Err(CoreError::InvalidParameter { .. })
    ));
}

#[test]
fn delete_frees_endpoint_for_reuse() {
    let cluster = cluster();
    let manager = manager(&cluster);
    let rule = manager.create(&alena(), &ctx()).unwrap();
    manager.delete(rule.id, &ctx()).unwrap();

    let again = manager.create(&alena(), &ctx()).unwrap();
    assert_eq!(again.id, RuleId::new(2));
}

#[test]
fn delete_works_after_dataplane_acknowledges() {
    let cluster = cluster();
    let manager = manager(&cluster);
    let rule = manager.create(&alena(), &ctx()).unwrap();

    assert_eq!(cluster.engine.acknowledge(), 1);
    assert_eq!(manager.get(rule.id).unwrap().state, RuleState::Active);

    assert!(manager.delete(rule.id, &ctx()).unwrap());
}

// ── List ────────────────────────────────────────────────────────────

#[test]
fn list_filters_by_account() {
    let cluster = cluster();
    cluster.add_account(AccountId::new(2), "tenant");
    let manager = manager(&cluster);
    manager.create(&alena(), &ctx()).unwrap();
    let mut other = alena();
    other.source_port = 80;
    other.account_id = AccountId::new(2);
    manager.create(&other, &ctx()).unwrap();

    let filter = RuleFilter {
        account_id: Some(AccountId::new(2)),
        ..RuleFilter::default()
    };
    let rules = manager.list(&filter);

    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].source_port, 80);
}

// ── Concurrency ─────────────────────────────────────────────────────

#[test]
fn identical_concurrent_creates_admit_at_most_one() {
    let cluster = cluster();
    let manager = Arc::new(manager(&cluster));

    let results: Vec<Result<_, CoreError>> = thread::scope(|s| {
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let manager = Arc::clone(&manager);
                s.spawn(move || manager.create(&alena(), &ctx()))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, CoreError::RuleConflict { .. }))
    );
    assert_eq!(cluster.rules.len(), 1);
}

#[test]
fn concurrent_create_and_delete_on_one_ip_keep_the_address_consistent() {
    let cluster = cluster();
    let manager = Arc::new(manager(&cluster));
    let ip = Ipv4Addr::new(10, 1, 1, 7);

    thread::scope(|s| {
        for port in 1..=8 {
            let manager = Arc::clone(&manager);
            s.spawn(move || {
                let mut req = alena();
                req.source_ip = Some(ip);
                req.source_port = port;
                let rule = manager.create(&req, &ctx()).unwrap();
                if port % 2 == 0 {
                    manager.delete(rule.id, &ctx()).unwrap();
                }
            });
        }
    });

    assert_eq!(cluster.rules.len(), 4);
    assert!(cluster.networks.is_in_use(NetworkId::new(GUEST), ip));
}
