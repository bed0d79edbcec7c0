//! Fire-and-forget dispatch of deletion announcements
//!
//! Deletions hand the removed artefact to an unbounded channel and return.
//! A background task drains the channel and calls the notifier on a blocking
//! thread, so a slow or failing third party never holds up a deletion.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collaborators::ThirdPartyNotifier;
use crate::metadata::Artefact;

#[derive(Clone)]
pub struct DeletionNotifications {
    sender: mpsc::UnboundedSender<Artefact>,
}

impl DeletionNotifications {
    /// Spawn the dispatcher task. Must be called from within a tokio runtime.
    ///
    /// The task exits once every `DeletionNotifications` clone is dropped and
    /// the queued announcements have been delivered.
    pub fn start(notifier: Arc<dyn ThirdPartyNotifier>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Artefact>();
        let handle = tokio::spawn(async move {
            while let Some(artefact) = receiver.recv().await {
                let notifier = notifier.clone();
                let id = artefact.id;
                match tokio::task::spawn_blocking(move || notifier.notify_deleted(&artefact)).await {
                    Ok(Ok(())) => debug!("Announced deletion of artefact {:?}", id),
                    Ok(Err(e)) => warn!("Third-party notification for artefact {:?} failed: {}", id, e),
                    Err(e) => error!("Notifier task for artefact {:?} panicked: {}", id, e),
                }
            }
            info!("Deletion notification dispatcher stopped");
        });
        (Self { sender }, handle)
    }

    /// Queue an announcement; never blocks and never fails the caller
    pub fn dispatch(&self, artefact: Artefact) {
        let id = artefact.id;
        if self.sender.send(artefact).is_err() {
            warn!("Notification dispatcher is gone, dropping announcement for artefact {:?}", id);
        }
    }
}
