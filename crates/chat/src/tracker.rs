use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one send-to-reply round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(pub u64);

impl ExchangeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "exchange-{}", self.0)
    }
}

/// Lifecycle of one exchange. An exchange that is not tracked is idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeState {
    AwaitingResponse,
    Delivered,
    Failed(String),
}

impl ExchangeState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::AwaitingResponse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeTransition {
    Deliver(ExchangeId),
    Fail { id: ExchangeId, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeTransitionRejection {
    Unknown(ExchangeId),
    AlreadySettled {
        id: ExchangeId,
        state: ExchangeState,
    },
}

pub type ExchangeTransitionResult = Result<ExchangeState, ExchangeTransitionRejection>;

/// Per-exchange state for every exchange started by one controller.
///
/// Several exchanges may await a response at once; nothing here orders them.
/// `in_flight` always equals the number of `AwaitingResponse` entries.
#[derive(Debug, Default)]
pub struct ExchangeTracker {
    next_id: u64,
    in_flight: usize,
    states: BTreeMap<ExchangeId, ExchangeState>,
}

impl ExchangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id and marks it as awaiting a response.
    pub fn begin(&mut self) -> ExchangeId {
        self.next_id += 1;
        let id = ExchangeId::new(self.next_id);
        self.states.insert(id, ExchangeState::AwaitingResponse);
        self.in_flight += 1;
        id
    }

    pub fn apply(&mut self, transition: ExchangeTransition) -> ExchangeTransitionResult {
        match transition {
            ExchangeTransition::Deliver(id) => self.settle(id, ExchangeState::Delivered),
            ExchangeTransition::Fail { id, message } => {
                self.settle(id, ExchangeState::Failed(message))
            }
        }
    }

    pub fn state(&self, id: ExchangeId) -> Option<&ExchangeState> {
        self.states.get(&id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    fn settle(&mut self, id: ExchangeId, next: ExchangeState) -> ExchangeTransitionResult {
        let Some(current) = self.states.get_mut(&id) else {
            return Err(ExchangeTransitionRejection::Unknown(id));
        };

        if current.is_settled() {
            return Err(ExchangeTransitionRejection::AlreadySettled {
                id,
                state: current.clone(),
            });
        }

        *current = next.clone();
        self.in_flight -= 1;
        Ok(next)
    }
}
