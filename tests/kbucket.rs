use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    thread,
};

use kbucket::{distance, Contact, Insert, KBucket, SyncKBucket};
use tracing_subscriber::{fmt, EnvFilter};

#[allow(dead_code)]
fn enable_tracing() {
    fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// A richer contact type than a bare id: the table only ever looks at the id bytes,
/// the address rides along untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Peer {
    id: Vec<u8>,
    addr: SocketAddr,
}

impl Peer {
    fn new(port: u16) -> Self {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);

        let mut sha = sha1_smol::Sha1::new();
        sha.update(addr.to_string().as_bytes());

        Self {
            id: sha.digest().bytes().to_vec(),
            addr,
        }
    }
}

impl Contact for Peer {
    fn id(&self) -> &[u8] {
        &self.id
    }
}

#[test]
fn peer_lifecycle() {
    // enable_tracing();

    let mut table = KBucket::new(Peer::new(0).id, 20);

    let peers: Vec<Peer> = (1..=50).map(Peer::new).collect();
    let mut accepted = 0;
    for peer in &peers {
        if let Insert::Added = table.add(peer.clone()).unwrap() {
            accepted += 1;
        }
    }
    assert_eq!(table.count(), accepted);

    // The stored contact comes back with its metadata intact.
    let probe = &peers[7];
    if table.contains(probe.id()) {
        assert_eq!(table.get(probe.id()).unwrap().addr, probe.addr);
    }

    // Remove whatever was stored; the table drains to empty.
    for peer in &peers {
        table.remove(peer.id());
    }
    assert!(table.is_empty());

    // Cleared tables accept the same peers again.
    table.add(peers[0].clone()).unwrap();
    table.clear();
    assert!(!table.contains(peers[0].id()));
}

#[test]
fn closest_agrees_with_brute_force() {
    let mut table = KBucket::new(Peer::new(0).id, 20);

    for port in 1..=200 {
        table.add(Peer::new(port)).unwrap();
    }

    let target = Peer::new(9999);
    let closest = table.closest(target.id());

    let mut expected: Vec<&Peer> = table.contacts();
    expected.sort_by_cached_key(|peer| distance(peer.id(), target.id()));

    assert_eq!(closest, expected);
    assert_eq!(closest.len(), table.count());

    // Spot-check the metric properties on the way through.
    assert!(distance(target.id(), target.id()).is_zero());
    let first = closest.first().unwrap();
    assert_eq!(
        distance(first.id(), target.id()),
        distance(target.id(), first.id())
    );
}

#[test]
fn eviction_negotiation_round_trip() {
    // Local id on the zero side, peers on the far side, so the far bucket fills and
    // freezes after the first split.
    let table = SyncKBucket::new(vec![0x00, 0x00], 4).with_nodes_to_ping(2);

    for i in 0..4 {
        table.add(vec![0x80, i]).unwrap();
    }
    // Lands on the near side and forces the split that freezes the far bucket.
    table.add(vec![0x00, 0x01]).unwrap();

    let newcomer = vec![0x80, 0x04];
    let event = match table.add(newcomer.clone()).unwrap() {
        Insert::Pending(event) => event,
        other => panic!("expected a pending insert, got {other:?}"),
    };

    assert_eq!(event.contact, newcomer);
    assert_eq!(event.candidates.len(), 2);

    // The lock is long gone here: ping the candidates, find the oldest one dead,
    // evict it and retry the rejected contact.
    let dead = &event.candidates[0];
    assert!(table.remove(dead.id()));
    assert_eq!(table.add(newcomer.clone()).unwrap(), Insert::Added);

    assert!(table.contains(newcomer.id()));
    assert!(!table.contains(dead.id()));
}

#[test]
fn concurrent_use_converges() {
    const THREADS: u16 = 10;
    const PER_THREAD: u16 = 100;

    let table: SyncKBucket<Peer> = SyncKBucket::new(Peer::new(0).id, 20);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let table = table.clone();
            thread::spawn(move || {
                let mut added = 0usize;
                for i in 0..PER_THREAD {
                    // Disjoint port ranges per thread, so every id is distinct.
                    let peer = Peer::new(1 + t * PER_THREAD + i);
                    match table.add(peer.clone()).unwrap() {
                        Insert::Added => added += 1,
                        Insert::Refreshed => panic!("distinct ids can't refresh"),
                        Insert::Pending(_) => {
                            // Far bucket full; readers still work mid-write-storm.
                            assert!(!table.contains(peer.id()));
                        }
                    }
                }
                added
            })
        })
        .collect();

    let added: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(table.count(), added);
    assert_eq!(table.contacts().len(), added);
}
