//! Gate kinds and their execution.
//!
//! A gate is a tagged variant rather than a trait object: the engine's
//! fan-out pattern-matches on the kind, keeping the composition root visible
//! with no hidden indirection. Execution never propagates errors upward:
//! infrastructure failures are captured in `GateResult::system_error`, which
//! keeps the engine's fan-in simple.

mod container;
mod factory;
mod review;

use tokio_util::sync::CancellationToken;

use crate::report::GateResult;

pub use container::ContainerGate;
pub use factory::Factory;
pub use review::ReviewGate;

/// One executable validation unit.
pub enum Gate {
    /// Command or script run inside a pooled container.
    Container(ContainerGate),
    /// LLM review of staged diffs.
    Review(ReviewGate),
    /// Immediately passes without doing anything.
    Skipped {
        /// Gate name.
        name: String,
        /// Kind tag for reporting.
        kind: String,
    },
    /// Test double with a scripted result and optional delay.
    #[cfg(test)]
    Fake(testing::FakeGate),
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container(_) => f.debug_tuple("Container").finish(),
            Self::Review(_) => f.debug_tuple("Review").finish(),
            Self::Skipped { name, kind } => f
                .debug_struct("Skipped")
                .field("name", name)
                .field("kind", kind)
                .finish(),
            #[cfg(test)]
            Self::Fake(_) => f.debug_tuple("Fake").finish(),
        }
    }
}

impl Gate {
    /// The configured gate name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Container(gate) => gate.name(),
            Self::Review(gate) => gate.name(),
            Self::Skipped { name, .. } => name,
            #[cfg(test)]
            Self::Fake(gate) => &gate.result.name,
        }
    }

    /// Run the gate to completion. Returns `None` only when execution was
    /// interrupted by cancellation (a fail-fast victim); every other path,
    /// including system errors, produces a terminal [`GateResult`].
    pub async fn execute(&self, cancel: &CancellationToken) -> Option<GateResult> {
        match self {
            Self::Container(gate) => gate.execute(cancel).await,
            Self::Review(gate) => gate.execute(cancel).await,
            Self::Skipped { name, kind } => Some(GateResult {
                name: name.clone(),
                kind: kind.clone(),
                passed: true,
                skipped: true,
                ..GateResult::default()
            }),
            #[cfg(test)]
            Self::Fake(gate) => gate.execute(cancel).await,
        }
    }
}
