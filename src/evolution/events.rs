//! Events and the rolling event log

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{CivId, GridPos};
use crate::evolution::resource::ResourceTally;
use crate::evolution::systems::disasters::DisasterKind;
use crate::evolution::systems::incidents::{Breakthrough, ChronicleKind};

/// A logged event
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: u32,
    pub year: i32,
    pub event_type: EventType,
    pub description: String,
    pub participants: Vec<CivId>,
    pub location: Option<GridPos>,
}

impl Event {
    pub fn tag(&self) -> &'static str {
        self.event_type.tag()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EventType {
    // Conflict and exchange
    War { attacker: CivId, defender: CivId, winner: CivId, loot: ResourceTally },
    Trade { parties: (CivId, CivId), efficiency: f64, relation_gain: f64 },
    Diplomatic { parties: (CivId, CivId), relation_change: f64 },

    // Internal and world-wide
    Internal { civ: CivId, tech_moved: f64, culture_moved: f64 },
    Global { effect: f64, cells_affected: usize },
    BalanceBreak { civ: CivId, breakthrough: Breakthrough },
    Chronicle { kind: ChronicleKind },
    TechResearch { civ: CivId, tech_id: String },

    // Lifecycle
    Collapse { civ: CivId },
    Revival { civ: CivId, heir_of: CivId },
    Merge { absorbed: (CivId, CivId), successor: CivId },
    Split { parent: CivId, successor: CivId },

    // Disasters
    Disaster { disaster_id: u32, kind: DisasterKind, radius: f64, cells_affected: usize },
    DisasterEnd { disaster_id: u32, kind: DisasterKind },
}

impl EventType {
    pub fn tag(&self) -> &'static str {
        match self {
            EventType::War { .. } => "war",
            EventType::Trade { .. } => "trade",
            EventType::Diplomatic { .. } => "diplomatic",
            EventType::Internal { .. } => "internal",
            EventType::Global { .. } => "global",
            EventType::BalanceBreak { .. } => "balance_break",
            EventType::Chronicle { kind } => kind.tag(),
            EventType::TechResearch { .. } => "tech_research",
            EventType::Collapse { .. } => "collapse",
            EventType::Revival { .. } => "revival",
            EventType::Merge { .. } => "merge",
            EventType::Split { .. } => "split",
            EventType::Disaster { .. } => "disaster",
            EventType::DisasterEnd { .. } => "disaster_end",
        }
    }
}

/// Bounded, newest-last event log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
    next_event_id: u32,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(50)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_event_id: 0,
        }
    }

    pub fn add_event(
        &mut self,
        event_type: EventType,
        year: i32,
        description: String,
        participants: Vec<CivId>,
        location: Option<GridPos>,
    ) -> u32 {
        let id = self.next_event_id;
        self.next_event_id += 1;

        tracing::debug!("[{}] {}: {}", year, event_type.tag(), description);
        self.events.push_back(Event {
            id,
            year,
            event_type,
            description,
            participants,
            location,
        });
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }

        id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total events ever logged, including evicted ones
    pub fn total_logged(&self) -> u32 {
        self.next_event_id
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&Event> {
        self.events.back()
    }

    pub fn events_for_civ(&self, civ: CivId) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.participants.contains(&civ))
    }
}
