pub mod acquire;
pub mod aggregator;
pub mod error;
pub mod handle;
pub mod submission;
pub mod transport;

pub use acquire::{AcquireSettings, Acquisition, Orchestrator, Outcome};
pub use aggregator::Aggregator;
pub use error::{AcquireError, SubmissionFailure, TransportError};
pub use handle::SubmissionHandle;
pub use submission::{Mode, Phase, Progress, Submission};
pub use transport::{
    HttpReply, HttpTransport, MessageStream, ReqwestTransport, StreamConnector, WsConnector,
};
