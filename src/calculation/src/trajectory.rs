//! Trajectory containers: a single run's state history and a labeled
//! collection of runs.

use std::fmt;
use std::ops::Index;

use ndarray::Array2;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::state::State;

/// Ordered state history of one run, one state per time step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    states: Vec<State>,
}

impl Trajectory {
    /// Empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty trajectory with room for `capacity` states.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, state: State) {
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn first(&self) -> Option<&State> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, State> {
        self.states.iter()
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn into_states(self) -> Vec<State> {
        self.states
    }

    /// `(x, y)` projection of every state.
    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.states.iter().map(State::position).collect()
    }

    /// Time stamp of every state for a fixed step `dt`, starting at zero.
    pub fn times(&self, dt: f64) -> Vec<f64> {
        (0..self.states.len()).map(|i| i as f64 * dt).collect()
    }

    /// States as a `(len, 6)` matrix, columns in field order.
    pub fn to_array(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.states.len(), State::LEN));
        for (mut row, state) in out.rows_mut().into_iter().zip(self.states.iter()) {
            for (cell, value) in row.iter_mut().zip(state.to_array()) {
                *cell = value;
            }
        }
        out
    }

    /// Index of the first state containing NaN or infinity.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.states.iter().position(|s| !s.is_finite())
    }

    pub fn all_finite(&self) -> bool {
        self.first_non_finite().is_none()
    }
}

impl From<Vec<State>> for Trajectory {
    fn from(states: Vec<State>) -> Self {
        Self { states }
    }
}

impl FromIterator<State> for Trajectory {
    fn from_iter<I: IntoIterator<Item = State>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for Trajectory {
    type Output = State;

    fn index(&self, index: usize) -> &State {
        &self.states[index]
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a State;
    type IntoIter = std::slice::Iter<'a, State>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

/// Labeled trajectories in insertion order.
///
/// Serializes as a map `{label: [[x, y, theta, vx, vy, omega], ...]}` whose
/// key order is the insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrajectoryDatabase {
    entries: Vec<(String, Trajectory)>,
}

impl TrajectoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a run. An existing label keeps its position and has its
    /// trajectory replaced, which is then returned.
    pub fn insert(&mut self, label: impl Into<String>, trajectory: Trajectory) -> Option<Trajectory> {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => Some(std::mem::replace(existing, trajectory)),
            None => {
                self.entries.push((label, trajectory));
                None
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&Trajectory> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, t)| t)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Trajectory)> {
        self.entries.iter().map(|(l, t)| (l.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Trajectory)> for TrajectoryDatabase {
    fn from_iter<I: IntoIterator<Item = (S, Trajectory)>>(iter: I) -> Self {
        let mut db = Self::new();
        for (label, trajectory) in iter {
            db.insert(label, trajectory);
        }
        db
    }
}

impl Serialize for TrajectoryDatabase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, trajectory) in &self.entries {
            map.serialize_entry(label, trajectory)?;
        }
        map.end()
    }
}

struct DatabaseVisitor;

impl<'de> Visitor<'de> for DatabaseVisitor {
    type Value = TrajectoryDatabase;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map from run label to a list of 6-element states")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut db = TrajectoryDatabase::new();
        while let Some((label, trajectory)) = access.next_entry::<String, Trajectory>()? {
            db.insert(label, trajectory);
        }
        Ok(db)
    }
}

impl<'de> Deserialize<'de> for TrajectoryDatabase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(DatabaseVisitor)
    }
}
