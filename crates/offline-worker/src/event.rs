//! Events delivered to the worker.

use offline_core::Request;
use offline_executor::Outcome;

use crate::error::WorkerError;
use crate::lifecycle::{ActivateReport, InstallReport};
use crate::messaging::ClientCommand;
use crate::worker::ServiceWorker;

/// Something the host platform asks the worker to handle.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A new deployment was registered.
    Install,
    /// The deployment is ready to take over.
    Activate,
    /// A view issued a request.
    Fetch(Request),
    /// A view posted a message.
    Message(ClientCommand),
}

/// What handling an event produced.
#[derive(Debug)]
pub enum EventResult {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetched(Outcome),
    /// Number of views the reply reached.
    Delivered(usize),
}

impl ServiceWorker {
    /// Route an event to its handler.
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<EventResult, WorkerError> {
        match event {
            WorkerEvent::Install => self.install().await.map(EventResult::Installed),
            WorkerEvent::Activate => self.activate().await.map(EventResult::Activated),
            WorkerEvent::Fetch(request) => Ok(EventResult::Fetched(self.fetch_outcome(request).await?)),
            WorkerEvent::Message(command) => Ok(EventResult::Delivered(self.handle_message(command))),
        }
    }
}
