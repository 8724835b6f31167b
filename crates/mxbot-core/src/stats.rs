use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};

use crate::domain::RoomId;

/// Activity counters. Increments are atomic so handlers can read a snapshot
/// through a shared reference.
#[derive(Debug)]
pub struct Stats {
    messages_sent: AtomicU64,
    commands_processed: AtomicU64,
    rooms_joined: AtomicU64,
    started_at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub messages_sent: u64,
    pub commands_processed: u64,
    pub rooms_joined: u64,
    pub uptime: Duration,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started_at: Instant) -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            commands_processed: AtomicU64::new(0),
            rooms_joined: AtomicU64::new(0),
            started_at,
        }
    }

    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_room_joined(&self) {
        self.rooms_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> StatsSnapshot {
        StatsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            commands_processed: self.commands_processed.load(Ordering::Relaxed),
            rooms_joined: self.rooms_joined.load(Ordering::Relaxed),
            uptime: now.saturating_duration_since(self.started_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomInfo {
    pub name: Option<String>,
    pub first_seen: DateTime<Local>,
}

/// Rooms the bot created or has seen itself joined to.
#[derive(Clone, Debug, Default)]
pub struct RoomTable {
    rooms: BTreeMap<RoomId, RoomInfo>,
}

impl RoomTable {
    /// Returns `true` when the room was not known before.
    pub fn insert(&mut self, room_id: RoomId, name: Option<String>) -> bool {
        if let Some(existing) = self.rooms.get_mut(&room_id) {
            if existing.name.is_none() {
                existing.name = name;
            }
            return false;
        }
        self.rooms.insert(
            room_id,
            RoomInfo {
                name,
                first_seen: Local::now(),
            },
        );
        true
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, &RoomInfo)> {
        self.rooms.iter()
    }
}

/// Mutable bot state threaded through the loop and handed to command handlers.
#[derive(Debug, Default)]
pub struct BotState {
    pub stats: Stats,
    pub rooms: RoomTable,
}

impl BotState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a room; counts it as joined the first time it is seen.
    pub fn note_room(&mut self, room_id: RoomId, name: Option<String>) {
        if self.rooms.insert(room_id, name) {
            self.stats.record_room_joined();
        }
    }
}
