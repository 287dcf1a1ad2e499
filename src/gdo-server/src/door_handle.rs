// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Thin handle giving the listener access to the door task and its state.

use tokio::sync::{mpsc, oneshot, watch};

use gdo_core::{DoorCommand, DoorError, DoorRequest, DoorResult, DoorSnapshot};

/// Latest published result of reading the door.
pub type DoorStatus = DoorResult<DoorSnapshot>;

/// A handle to the running door task.
#[derive(Clone)]
pub struct DoorHandle {
    /// Door display name.
    pub name: String,
    /// Send commands to the door task.
    pub door_tx: mpsc::Sender<DoorRequest>,
    /// Watch the latest door status for fast GetState responses.
    pub state_rx: watch::Receiver<DoorStatus>,
}

impl DoorHandle {
    /// Current status without a round trip through the task.
    pub fn status(&self) -> DoorStatus {
        self.state_rx.borrow().clone()
    }

    /// Send a command and wait for its single response.
    pub async fn request(&self, cmd: DoorCommand) -> DoorStatus {
        let (respond_to, resp_rx) = oneshot::channel();
        self.door_tx
            .send(DoorRequest { cmd, respond_to })
            .await
            .map_err(|_| DoorError::communication_failure("door task not available"))?;
        resp_rx
            .await
            .map_err(|_| DoorError::communication_failure("door task dropped the request"))?
    }
}
