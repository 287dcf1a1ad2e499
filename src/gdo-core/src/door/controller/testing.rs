// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! In-memory pins shared by the controller tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::pins::{Level, PinId, PinIo, Pull};
use crate::DynResult;

#[derive(Default)]
struct FakeBoard {
    levels: HashMap<PinId, Level>,
    outputs: HashMap<PinId, Level>,
    inputs: HashMap<PinId, Pull>,
    writes: Vec<(PinId, Level)>,
    fail_reads: bool,
}

/// Pins backed by a shared map. Clones observe the same board.
#[derive(Clone, Default)]
pub struct FakePins {
    board: Arc<Mutex<FakeBoard>>,
}

impl FakePins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&self, pin: PinId, level: Level) {
        self.board.lock().unwrap().levels.insert(pin, level);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.board.lock().unwrap().fail_reads = fail;
    }

    pub fn writes(&self) -> Vec<(PinId, Level)> {
        self.board.lock().unwrap().writes.clone()
    }

    pub fn writes_of(&self, pin: PinId, level: Level) -> usize {
        self.writes()
            .iter()
            .filter(|(p, l)| *p == pin && *l == level)
            .count()
    }

    pub fn output(&self, pin: PinId) -> Option<Level> {
        self.board.lock().unwrap().outputs.get(&pin).copied()
    }

    pub fn input_pull(&self, pin: PinId) -> Option<Pull> {
        self.board.lock().unwrap().inputs.get(&pin).copied()
    }
}

impl PinIo for FakePins {
    fn configure_output(&mut self, pin: PinId, initial: Level) -> DynResult<()> {
        self.board.lock().unwrap().outputs.insert(pin, initial);
        Ok(())
    }

    fn configure_input(&mut self, pin: PinId, pull: Pull) -> DynResult<()> {
        self.board.lock().unwrap().inputs.insert(pin, pull);
        Ok(())
    }

    fn read(&mut self, pin: PinId) -> DynResult<Level> {
        let board = self.board.lock().unwrap();
        if board.fail_reads {
            return Err("read failed".into());
        }
        Ok(board.levels.get(&pin).copied().unwrap_or(Level::Low))
    }

    fn write(&mut self, pin: PinId, level: Level) -> DynResult<()> {
        let mut board = self.board.lock().unwrap();
        board.outputs.insert(pin, level);
        board.writes.push((pin, level));
        Ok(())
    }
}
