// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

/// Registry key for a pin backend name as typed in config or on the CLI.
///
/// Keeps ASCII letters and digits only, lowercased, so `"Sim"`, `" sim "`
/// and `"SIM"` all select the same backend.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
