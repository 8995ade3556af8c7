//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use letter_rush::{ALPHABET, ConnectionId, Gateway, Pin, ServerEvent, WordSets};

/// Every letter has a valid animal and city: "<letter>oo" and "<letter>ville".
pub fn alphabet_words() -> WordSets {
    let letters = || ALPHABET.iter().map(|c| c.to_ascii_lowercase());
    WordSets::new()
        .with_category("animal", letters().map(|c| format!("{c}oo")))
        .with_category("city", letters().map(|c| format!("{c}ville")))
}

/// Gateway that records what every connection would have received.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    rooms: Mutex<HashMap<Pin, HashSet<ConnectionId>>>,
    inbox: Mutex<HashMap<ConnectionId, Vec<ServerEvent>>>,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything `conn` received, in order.
    pub fn events(&self, conn: ConnectionId) -> Vec<ServerEvent> {
        self.inbox
            .lock()
            .unwrap()
            .get(&conn)
            .cloned()
            .unwrap_or_default()
    }

    /// Names of everything `conn` received, in order.
    pub fn names(&self, conn: ConnectionId) -> Vec<&'static str> {
        self.events(conn).iter().map(ServerEvent::name).collect()
    }

    /// How many events named `name` reached `conn`.
    pub fn count(&self, conn: ConnectionId, name: &str) -> usize {
        self.names(conn).iter().filter(|n| **n == name).count()
    }

    /// Forgets everything received so far.
    pub fn clear(&self) {
        self.inbox.lock().unwrap().clear();
    }

    pub fn members(&self, pin: &Pin) -> HashSet<ConnectionId> {
        self.rooms
            .lock()
            .unwrap()
            .get(pin)
            .cloned()
            .unwrap_or_default()
    }

    fn push(&self, conn: ConnectionId, event: ServerEvent) {
        self.inbox
            .lock()
            .unwrap()
            .entry(conn)
            .or_default()
            .push(event);
    }
}

impl Gateway for RecordingGateway {
    fn join_room(&self, pin: &Pin, conn: ConnectionId) {
        self.rooms
            .lock()
            .unwrap()
            .entry(pin.clone())
            .or_default()
            .insert(conn);
    }

    fn leave_room(&self, pin: &Pin, conn: ConnectionId) {
        if let Some(members) = self.rooms.lock().unwrap().get_mut(pin) {
            members.remove(&conn);
        }
    }

    fn close_room(&self, pin: &Pin) {
        self.rooms.lock().unwrap().remove(pin);
    }

    fn broadcast(&self, pin: &Pin, event: ServerEvent) {
        for conn in self.members(pin) {
            self.push(conn, event.clone());
        }
    }

    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        self.push(conn, event);
    }
}
