// Correlation broker
//
// Bridges a tool handler that needs a human answer with whatever collects
// it (the UI host, an in-process channel). A handler calls `request`,
// which registers a pending waiter, emits a `collect-input` message on the
// out-of-band sink and hands back a `Ticket`. The waiter is settled exactly
// once by `resolve`, `cancel`, its deadline, or the shutdown flush.
//
// Architecture:
// - CorrelationBroker: owns the pending-waiter table
// - TimeoutSupervisor: arms one deadline timer per waiter
// - OutOfBandSink: transport adapter for the out-of-band stream

mod correlation;
pub mod sink;
pub mod timeout;
mod waiter;

pub use correlation::CorrelationBroker;
pub use sink::{ChannelSink, DisconnectedSink, OutOfBandMessage, OutOfBandSink};
pub use timeout::TimeoutSupervisor;
pub use waiter::{Settlement, Ticket, WaiterInfo};
