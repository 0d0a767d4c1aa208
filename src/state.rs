use strum::{Display, EnumString};

/// Where an invocation is in its lifecycle.
///
/// `Pending` moves to `Simulated`, `Running` or `Failed`; `Running` moves to
/// `Done` or `Failed`. The last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InvocationState {
    Pending,
    Simulated,
    Running,
    Done,
    Failed,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InvocationState::Simulated | InvocationState::Done | InvocationState::Failed
        )
    }

    pub fn can_transition_to(self, next: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (Pending, Simulated) | (Pending, Running) | (Pending, Failed) | (Running, Done) | (Running, Failed)
        )
    }
}
