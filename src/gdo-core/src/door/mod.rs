// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod command;
pub mod config;
pub mod controller;
pub mod request;
pub mod response;
pub mod state;
