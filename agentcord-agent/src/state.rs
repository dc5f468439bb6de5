// ABOUTME: Ordered event log for one agent session plus its idle/busy state.
// ABOUTME: EventCursor marks a position in the log so callers replay only newer events.

use crate::event::{AgentEvent, SequencedEvent};
use std::collections::{BTreeMap, VecDeque};

/// Default number of events retained per session
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 1024;

/// Position marker into a session's event log.
///
/// A cursor names the sequence number of the next event to be appended at the
/// time it was captured; replaying from it yields only events appended later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventCursor(u64);

impl EventCursor {
    /// Cursor at the very beginning of a log
    pub const START: EventCursor = EventCursor(0);

    pub fn position(&self) -> u64 {
        self.0
    }

    pub(crate) fn after(seq: u64) -> Self {
        Self(seq + 1)
    }
}

/// Lightweight copy of a session's state, returned by idle waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub idle: bool,
    pub pending_inputs: usize,
    /// Position after the last event in the log at snapshot time
    pub cursor: EventCursor,
}

/// Event log and processing state published by a session worker.
///
/// Sequence numbers are assigned in append order and never reused. When the
/// log grows past its capacity the oldest events are dropped, except that an
/// event at or after a pinned cursor is kept until the pin is released.
#[derive(Debug, Clone)]
pub struct AgentState {
    events: VecDeque<SequencedEvent>,
    next_seq: u64,
    capacity: usize,
    pending_inputs: usize,
    /// Cursor positions held by live subscriptions, with a count per position
    pins: BTreeMap<u64, usize>,
}

impl AgentState {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_seq: 0,
            capacity: capacity.max(1),
            pending_inputs: 0,
            pins: BTreeMap::new(),
        }
    }

    /// True when no submitted input is queued or running
    pub fn is_idle(&self) -> bool {
        self.pending_inputs == 0
    }

    pub fn pending_inputs(&self) -> usize {
        self.pending_inputs
    }

    /// Cursor positioned after the newest event
    pub fn cursor(&self) -> EventCursor {
        EventCursor(self.next_seq)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            idle: self.is_idle(),
            pending_inputs: self.pending_inputs,
            cursor: self.cursor(),
        }
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Retained events with a sequence number at or after `cursor`, in order
    pub fn events_since(&self, cursor: EventCursor) -> Vec<SequencedEvent> {
        let Some(first) = self.events.front().map(|e| e.seq) else {
            return Vec::new();
        };
        let skip = cursor.0.saturating_sub(first) as usize;
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Events at or after `cursor` that were evicted before they could be read
    pub fn evicted_since(&self, cursor: EventCursor) -> u64 {
        let first = self.events.front().map_or(self.next_seq, |e| e.seq);
        first.saturating_sub(cursor.0)
    }

    /// Number of live pins
    pub fn pinned(&self) -> usize {
        self.pins.values().sum()
    }

    pub(crate) fn push(&mut self, event: AgentEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push_back(SequencedEvent { seq, event });
        self.trim();
        seq
    }

    /// Keep events at or after `cursor` until the pin is released
    pub(crate) fn pin(&mut self, cursor: EventCursor) {
        *self.pins.entry(cursor.0).or_insert(0) += 1;
    }

    pub(crate) fn unpin(&mut self, cursor: EventCursor) {
        if let Some(count) = self.pins.get_mut(&cursor.0) {
            *count -= 1;
            if *count == 0 {
                self.pins.remove(&cursor.0);
            }
        }
        self.trim();
    }

    pub(crate) fn move_pin(&mut self, from: EventCursor, to: EventCursor) {
        if from != to {
            self.pin(to);
            self.unpin(from);
        }
    }

    /// Drop the oldest events beyond capacity, stopping at the lowest pin
    fn trim(&mut self) {
        let floor = self.pins.keys().next().copied().unwrap_or(u64::MAX);
        while self.events.len() > self.capacity
            && self.events.front().is_some_and(|e| e.seq < floor)
        {
            self.events.pop_front();
        }
    }

    pub(crate) fn begin_input(&mut self) {
        self.pending_inputs += 1;
    }

    /// Mark one input finished; appends `idle` once the queue drains
    pub(crate) fn finish_input(&mut self) {
        self.pending_inputs = self.pending_inputs.saturating_sub(1);
        if self.pending_inputs == 0 {
            self.push(AgentEvent::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(text: &str) -> AgentEvent {
        AgentEvent::OutputChat {
            content: text.to_string(),
        }
    }

    #[test]
    fn test_new_state_is_idle_and_empty() {
        let state = AgentState::new(8);
        assert!(state.is_idle());
        assert!(state.is_empty());
        assert_eq!(state.cursor(), EventCursor::START);
    }

    #[test]
    fn test_events_since_skips_events_before_cursor() {
        let mut state = AgentState::new(8);
        state.push(chat("old"));
        let cursor = state.cursor();
        state.push(chat("new"));

        let events = state.events_since(cursor);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[0].event, chat("new"));
    }

    #[test]
    fn test_capacity_drops_oldest_but_keeps_sequence_numbers() {
        let mut state = AgentState::new(2);
        for i in 0..5 {
            state.push(chat(&i.to_string()));
        }
        assert_eq!(state.len(), 2);

        let events = state.events_since(EventCursor::START);
        let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 4]);
        assert_eq!(state.cursor().position(), 5);
    }

    #[test]
    fn test_pinned_events_survive_past_capacity() {
        let mut state = AgentState::new(2);
        state.push(chat("before"));
        let cursor = state.cursor();
        state.pin(cursor);
        for i in 0..4 {
            state.push(chat(&i.to_string()));
        }

        let seqs: Vec<u64> = state.events_since(cursor).iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
        assert_eq!(state.evicted_since(cursor), 0);

        state.move_pin(cursor, EventCursor::after(2));
        assert_eq!(state.events_since(EventCursor::START).len(), 2);

        state.unpin(EventCursor::after(2));
        assert_eq!(state.pinned(), 0);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_evicted_since_counts_lost_events() {
        let mut state = AgentState::new(2);
        for i in 0..5 {
            state.push(chat(&i.to_string()));
        }
        assert_eq!(state.evicted_since(EventCursor::START), 3);
        assert_eq!(state.evicted_since(state.cursor()), 0);
        assert_eq!(AgentState::new(2).evicted_since(EventCursor::START), 0);
    }

    #[test]
    fn test_cursor_past_end_yields_nothing() {
        let mut state = AgentState::new(4);
        state.push(chat("a"));
        assert!(state.events_since(state.cursor()).is_empty());
    }

    #[test]
    fn test_finish_input_appends_idle_only_when_drained() {
        let mut state = AgentState::new(8);
        state.begin_input();
        state.begin_input();
        assert!(!state.is_idle());

        state.finish_input();
        assert!(!state.is_idle());
        assert!(state.is_empty());

        state.finish_input();
        assert!(state.is_idle());
        let events = state.events_since(EventCursor::START);
        assert_eq!(events.last().map(|e| &e.event), Some(&AgentEvent::Idle));
    }
}
