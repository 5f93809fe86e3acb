use std::collections::HashSet;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{Day, Slot};

/// One teaching period as written in config: `label`, `start` and `end` ("HH:MM").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub label: String,
    pub start: String,
    pub end: String,
}

impl SlotDefinition {
    pub fn new(label: &str, start: &str, end: &str) -> Self {
        Self {
            label: label.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.label.clone())
    }
}

/// The `[catalog]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_days")]
    pub days: Vec<Day>,
    #[serde(default = "default_slots")]
    pub slots: Vec<SlotDefinition>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            slots: default_slots(),
        }
    }
}

fn default_days() -> Vec<Day> {
    Day::ALL.to_vec()
}

// Eight 45-minute periods with a 30-minute break after the fourth.
fn default_slots() -> Vec<SlotDefinition> {
    [
        ("08:00", "08:45"),
        ("08:45", "09:30"),
        ("09:30", "10:15"),
        ("10:15", "11:00"),
        ("11:30", "12:15"),
        ("12:15", "13:00"),
        ("13:00", "13:45"),
        ("13:45", "14:30"),
    ]
    .iter()
    .map(|(start, end)| SlotDefinition::new(&format!("{start}-{end}"), start, end))
    .collect()
}

/// Validated, immutable catalog of teaching days and periods.
///
/// Construction guarantees that slots are in ascending order and never
/// overlap, which is what lets the rest of the engine compare slots by label
/// alone.
#[derive(Debug, Clone)]
pub struct SlotCatalog {
    days: Vec<Day>,
    slots: Vec<SlotDefinition>,
    bounds: Vec<(NaiveTime, NaiveTime)>,
}

impl SlotCatalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        if config.days.is_empty() {
            return Err(CoreError::InvalidCatalog("no days configured".into()));
        }
        if config.slots.is_empty() {
            return Err(CoreError::InvalidCatalog("no slots configured".into()));
        }

        let mut seen_days = HashSet::new();
        for day in &config.days {
            if !seen_days.insert(*day) {
                return Err(CoreError::InvalidCatalog(format!("duplicate day: {day}")));
            }
        }
        let mut days = config.days.clone();
        days.sort();

        let mut labels = HashSet::new();
        let mut bounds = Vec::with_capacity(config.slots.len());
        for def in &config.slots {
            if def.label.trim().is_empty() {
                return Err(CoreError::InvalidCatalog("slot label must not be blank".into()));
            }
            if !labels.insert(def.label.as_str()) {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate slot label: {}",
                    def.label
                )));
            }
            let start = parse_time(&def.label, &def.start)?;
            let end = parse_time(&def.label, &def.end)?;
            if start >= end {
                return Err(CoreError::InvalidCatalog(format!(
                    "slot {} starts at or after its end",
                    def.label
                )));
            }
            if let Some(&(_, prev_end)) = bounds.last() {
                if start < prev_end {
                    return Err(CoreError::InvalidCatalog(format!(
                        "slot {} overlaps or precedes the slot before it",
                        def.label
                    )));
                }
            }
            bounds.push((start, end));
        }

        Ok(Self {
            days,
            slots: config.slots.clone(),
            bounds,
        })
    }

    /// Days in week order.
    pub fn days(&self) -> &[Day] {
        &self.days
    }

    /// Slot definitions in time order.
    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    pub fn contains_day(&self, day: Day) -> bool {
        self.days.contains(&day)
    }

    pub fn contains_slot(&self, slot: &Slot) -> bool {
        self.slot_position(slot).is_some()
    }

    /// Index of `slot` in time order, used to sort schedule listings.
    pub fn slot_position(&self, slot: &Slot) -> Option<usize> {
        self.slots.iter().position(|d| d.label == slot.as_str())
    }

    /// Gaps between consecutive slots (breaks), as `(from, until)` pairs.
    pub fn breaks(&self) -> Vec<(NaiveTime, NaiveTime)> {
        self.bounds
            .windows(2)
            .filter(|w| w[0].1 < w[1].0)
            .map(|w| (w[0].1, w[1].0))
            .collect()
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self::from_config(&CatalogConfig::default()).expect("built-in slot catalog is valid")
    }
}

fn parse_time(label: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        CoreError::InvalidCatalog(format!("slot {label}: bad time {value:?}: {e}"))
    })
}
