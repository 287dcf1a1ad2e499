// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};

use crate::door::response::{DoorError, DoorErrorKind, DoorResult};
use crate::door::state::{DoorSnapshot, TargetState};

/// Command received from network clients (JSON).
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ClientCommand {
    GetState,
    SetTarget { target: TargetState },
}

/// Envelope for client commands with optional authentication token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub token: Option<String>,
    #[serde(flatten)]
    pub cmd: ClientCommand,
}

/// Response sent to network clients over TCP.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientResponse {
    pub success: bool,
    pub state: Option<DoorSnapshot>,
    pub error: Option<String>,
    pub code: Option<DoorErrorKind>,
}

impl ClientResponse {
    pub fn ok(state: DoorSnapshot) -> Self {
        Self {
            success: true,
            state: Some(state),
            error: None,
            code: None,
        }
    }

    pub fn err(error: &DoorError) -> Self {
        Self {
            success: false,
            state: None,
            error: Some(error.message.clone()),
            code: Some(error.kind),
        }
    }

    /// Error not tied to the door (bad JSON, auth).
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            state: None,
            error: Some(message.into()),
            code: None,
        }
    }
}

impl From<DoorResult<DoorSnapshot>> for ClientResponse {
    fn from(result: DoorResult<DoorSnapshot>) -> Self {
        match result {
            Ok(state) => Self::ok(state),
            Err(e) => Self::err(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let env: ClientEnvelope =
            serde_json::from_str(r#"{"cmd":"set_target","target":"open","token":"abc"}"#).unwrap();
        assert_eq!(env.token.as_deref(), Some("abc"));
        match env.cmd {
            ClientCommand::SetTarget { target } => assert_eq!(target, TargetState::Open),
            other => panic!("unexpected command {:?}", other),
        }

        let env: ClientEnvelope = serde_json::from_str(r#"{"cmd":"get_state"}"#).unwrap();
        assert!(env.token.is_none());
        assert!(matches!(env.cmd, ClientCommand::GetState));
    }

    #[test]
    fn test_reject_unknown_target() {
        let parsed = serde_json::from_str::<ClientEnvelope>(r#"{"cmd":"set_target","target":"ajar"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_error_response() {
        let resp = ClientResponse::err(&DoorError::busy(TargetState::Closed));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "busy");
        assert!(json["state"].is_null());
    }
}
