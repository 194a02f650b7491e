//! The finite-state machine that shapes a multi-turn conversation.
//!
//! A `StateMachine` is a static policy skeleton: each `State` says when it
//! applies (`scenario`) and what the assistant should do there
//! (`instruction`). Transitions are explicit via `next_states`, except for
//! `free_states` which are reachable from anywhere (global "greeting",
//! "fallback", and the like). The machine is read-only during a turn.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One dialogue state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Unique name within the machine.
    pub name: String,

    /// When this state applies (free text, shown to the LLM).
    #[serde(default)]
    pub scenario: String,

    /// What the assistant should do in this state.
    #[serde(default)]
    pub instruction: String,

    /// Names of states reachable from here.
    #[serde(default)]
    pub next_states: Vec<String>,
}

impl State {
    /// A transient state with only an instruction, as synthesized when no
    /// machine is configured.
    pub fn transient(
        name: impl Into<String>,
        scenario: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            scenario: scenario.into(),
            instruction: instruction.into(),
            next_states: Vec::new(),
        }
    }
}

/// The conversation policy: an ordered set of states plus transition rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateMachine {
    /// All states, in declaration order. Names must be unique.
    #[serde(default)]
    pub states: Vec<State>,

    /// States reachable from any state.
    #[serde(default)]
    pub free_states: Vec<String>,

    /// Initial state; the first declared state when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_state: Option<String>,
}

impl StateMachine {
    /// Whether the machine has no states at all (dynamic-state mode).
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Look up a state by name.
    pub fn get(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    /// The entry state: `entry_state` when set, otherwise the first declared.
    pub fn entry(&self) -> Option<&State> {
        match &self.entry_state {
            Some(name) => self.get(name),
            None => self.states.first(),
        }
    }

    fn is_free(&self, name: &str) -> bool {
        self.free_states.iter().any(|f| f == name)
    }

    /// Check the structural invariants: unique names, every referenced name
    /// declared, entry state declared.
    pub fn validate(&self) -> Result<()> {
        for (i, state) in self.states.iter().enumerate() {
            if state.name.is_empty() {
                return Err(Error::config("state names must be non-empty"));
            }
            if self.states[..i].iter().any(|s| s.name == state.name) {
                return Err(Error::config(format!(
                    "duplicate state name: {}",
                    state.name
                )));
            }
        }
        for state in &self.states {
            for next in &state.next_states {
                if self.get(next).is_none() {
                    return Err(Error::config(format!(
                        "state {} names unknown next state {next}",
                        state.name
                    )));
                }
            }
        }
        for free in &self.free_states {
            if self.get(free).is_none() {
                return Err(Error::config(format!("unknown free state: {free}")));
            }
        }
        if let Some(entry) = &self.entry_state {
            if self.get(entry).is_none() {
                return Err(Error::config(format!("unknown entry state: {entry}")));
            }
        }
        Ok(())
    }

    /// Enumerate the states the conversation may move to next.
    ///
    /// From an empty or unknown current state every state is a candidate,
    /// free states first. Otherwise the candidates are the current state's
    /// `next_states` plus all free states, de-duplicated, in declaration
    /// order.
    pub fn next_candidates(&self, current: &str) -> Vec<&State> {
        if self.states.is_empty() {
            return Vec::new();
        }

        let current_state = if current.is_empty() {
            None
        } else {
            self.get(current)
        };

        match current_state {
            None => {
                let mut candidates: Vec<&State> = self
                    .states
                    .iter()
                    .filter(|s| self.is_free(&s.name))
                    .collect();
                candidates.extend(self.states.iter().filter(|s| !self.is_free(&s.name)));
                candidates
            }
            Some(state) => self
                .states
                .iter()
                .filter(|s| {
                    state.next_states.iter().any(|n| n == &s.name) || self.is_free(&s.name)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str, next: &[&str]) -> State {
        State {
            name: name.into(),
            scenario: format!("scenario for {name}"),
            instruction: format!("instruction for {name}"),
            next_states: next.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn machine() -> StateMachine {
        StateMachine {
            states: vec![
                state("greet", &["ask"]),
                state("ask", &["answer"]),
                state("answer", &[]),
                state("fallback", &[]),
            ],
            free_states: vec!["fallback".into()],
            entry_state: Some("greet".into()),
        }
    }

    #[test]
    fn lookup_and_entry() {
        let fsm = machine();
        assert_eq!(fsm.get("ask").unwrap().name, "ask");
        assert!(fsm.get("nope").is_none());
        assert_eq!(fsm.entry().unwrap().name, "greet");

        let mut no_entry = machine();
        no_entry.entry_state = None;
        assert_eq!(no_entry.entry().unwrap().name, "greet");
    }

    #[test]
    fn candidates_from_known_state() {
        let fsm = machine();
        let names: Vec<&str> = fsm
            .next_candidates("greet")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["ask", "fallback"]);
    }

    #[test]
    fn candidates_from_unknown_state_lists_free_first() {
        let fsm = machine();
        let names: Vec<&str> = fsm
            .next_candidates("")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["fallback", "greet", "ask", "answer"]);

        // Unknown names behave the same as empty
        let unknown: Vec<&str> = fsm
            .next_candidates("never-declared")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(unknown, names);
    }

    #[test]
    fn candidates_deduplicate_free_next_overlap() {
        let mut fsm = machine();
        // "fallback" is both a next state and a free state
        fsm.states[0].next_states.push("fallback".into());
        let names: Vec<&str> = fsm
            .next_candidates("greet")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["ask", "fallback"]);
    }

    #[test]
    fn empty_machine_has_no_candidates() {
        let fsm = StateMachine::default();
        assert!(fsm.is_empty());
        assert!(fsm.next_candidates("").is_empty());
    }

    #[test]
    fn validate_rejects_bad_references() {
        let mut fsm = machine();
        fsm.states[0].next_states.push("ghost".into());
        assert!(fsm.validate().is_err());

        let mut fsm = machine();
        fsm.free_states.push("ghost".into());
        assert!(fsm.validate().is_err());

        let mut fsm = machine();
        fsm.entry_state = Some("ghost".into());
        assert!(fsm.validate().is_err());

        let mut fsm = machine();
        fsm.states.push(state("greet", &[]));
        assert!(fsm.validate().is_err());

        assert!(machine().validate().is_ok());
    }
}
