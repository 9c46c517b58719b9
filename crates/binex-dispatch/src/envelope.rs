//! Items on the inbound queue.

use binex_ledger::LedgerState;
use binex_types::InboundCommand;
use tokio::sync::oneshot;

/// One unit of work for the dispatcher.
#[derive(Debug)]
pub enum Envelope {
    /// A decoded command.
    Command(InboundCommand),
    /// A raw JSON envelope straight from the gateway.
    Raw(String),
    /// Reply with a copy of the ledger, taken between two commands.
    Capture(oneshot::Sender<LedgerState>),
    /// Stop after everything queued ahead of this.
    Shutdown,
}

impl Envelope {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Command(inbound) => inbound.command.name(),
            Self::Raw(_) => "RAW",
            Self::Capture(_) => "CAPTURE",
            Self::Shutdown => "SHUTDOWN",
        }
    }
}
