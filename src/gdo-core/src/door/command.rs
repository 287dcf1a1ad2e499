// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use crate::TargetState;

/// Internal command handled by the door task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorCommand {
    GetSnapshot,
    SetTarget(TargetState),
}
