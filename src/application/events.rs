use crate::domain::workflow::WorkflowState;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    StateChanged(WorkflowState),
    CredentialDialog { open: bool },
    /// The form has new values to show (edit-and-resubmit or extend).
    FormSeeded,
}

#[derive(Debug)]
pub struct EventHub {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        // Surfaces drain events as they arrive; a small buffer is enough
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Returns the number of subscribers reached. Zero is not an error.
    pub fn publish(&self, event: WorkflowEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
