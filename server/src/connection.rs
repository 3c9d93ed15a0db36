//! Transport-level connection tracking for the canvas server
//!
//! This module manages the set of live datagram endpoints, below the session
//! layer: connection id assignment, address lookup for response routing,
//! activity tracking, and idle-timeout cleanup. Whether a connection has
//! registered a player name is the session registry's concern, not this one's.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A live connection: one remote endpoint exchanging packets with us.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection id assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this endpoint
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// True if no packet has arrived from this endpoint within `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Tracks every live connection by id and by address.
///
/// The table is shared between the main loop (packet dispatch), the sender
/// task (broadcast fan-out), and the timeout checker, so it holds only
/// transport bookkeeping; all canvas state lives behind the engine.
pub struct ConnectionTable {
    connections: HashMap<u32, Connection>,
    next_id: u32,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
        }
    }

    /// Admits a new connection and returns its assigned id.
    pub fn add(&mut self, addr: SocketAddr) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        info!("Connection {} established from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr));
        id
    }

    /// Drops a connection. Returns true if it was present.
    pub fn remove(&mut self, id: u32) -> bool {
        if let Some(conn) = self.connections.remove(&id) {
            info!("Connection {} closed ({})", conn.id, conn.addr);
            true
        } else {
            false
        }
    }

    /// Resolves the connection id for an incoming datagram's source address.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.connections
            .iter()
            .find(|(_, conn)| conn.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Address to send responses for this connection to.
    pub fn addr_of(&self, id: u32) -> Option<SocketAddr> {
        self.connections.get(&id).map(|conn| conn.addr)
    }

    /// Records packet activity, deferring the idle timeout.
    pub fn touch(&mut self, id: u32) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.last_seen = Instant::now();
        }
    }

    /// Removes connections idle longer than `timeout` and returns their ids
    /// so the engine can tear down the matching sessions.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .connections
            .iter()
            .filter(|(_, conn)| conn.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for id in &timed_out {
            self.remove(*id);
        }

        timed_out
    }

    /// All connected endpoints, for broadcast fan-out.
    pub fn addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.connections
            .iter()
            .map(|(id, conn)| (*id, conn.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let mut table = ConnectionTable::new();

        assert_eq!(table.add(test_addr()), 1);
        assert_eq!(table.add(test_addr2()), 2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remove_connection() {
        let mut table = ConnectionTable::new();
        let id = table.add(test_addr());

        assert!(table.remove(id));
        assert!(table.is_empty());
        assert!(!table.remove(id));
    }

    #[test]
    fn test_find_by_addr() {
        let mut table = ConnectionTable::new();
        let id = table.add(test_addr());
        let _other = table.add(test_addr2());

        assert_eq!(table.find_by_addr(test_addr()), Some(id));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(table.find_by_addr(unknown), None);
    }

    #[test]
    fn test_addr_of() {
        let mut table = ConnectionTable::new();
        let id = table.add(test_addr());

        assert_eq!(table.addr_of(id), Some(test_addr()));
        assert_eq!(table.addr_of(999), None);
    }

    #[test]
    fn test_timeout_sweep() {
        let mut table = ConnectionTable::new();
        let stale = table.add(test_addr());
        let fresh = table.add(test_addr2());

        table
            .connections
            .get_mut(&stale)
            .unwrap()
            .last_seen = Instant::now() - Duration::from_secs(30);

        let removed = table.check_timeouts(Duration::from_secs(10));
        assert_eq!(removed, vec![stale]);
        assert_eq!(table.len(), 1);
        assert!(table.addr_of(fresh).is_some());
    }

    #[test]
    fn test_touch_defers_timeout() {
        let mut table = ConnectionTable::new();
        let id = table.add(test_addr());

        table
            .connections
            .get_mut(&id)
            .unwrap()
            .last_seen = Instant::now() - Duration::from_secs(30);
        table.touch(id);

        let removed = table.check_timeouts(Duration::from_secs(10));
        assert!(removed.is_empty());
    }

    #[test]
    fn test_addrs_lists_everyone() {
        let mut table = ConnectionTable::new();
        table.add(test_addr());
        table.add(test_addr2());

        let mut addrs = table.addrs();
        addrs.sort_by_key(|(id, _)| *id);
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].1, test_addr());
        assert_eq!(addrs[1].1, test_addr2());
    }
}
