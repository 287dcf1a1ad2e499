// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tokio::sync::oneshot;

use crate::{DoorCommand, DoorResult, DoorSnapshot};

/// Request sent to the door task. `respond_to` is answered exactly once.
#[derive(Debug)]
pub struct DoorRequest {
    pub cmd: DoorCommand,
    pub respond_to: oneshot::Sender<DoorResult<DoorSnapshot>>,
}
