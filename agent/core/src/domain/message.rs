// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Wire Message Codec
//!
//! One message per transport payload, ASCII text, fields separated by
//! whitespace, no terminator:
//!
//! | Kind | Form | Meaning |
//! |------|------|---------|
//! | belief | `0 <source> <timestamp> <belief>` | belief datum of `source` |
//! | action | `1 1 <d>` | start acting with estimate `d` |
//! | action | `1 0 -1` | stop acting |
//!
//! Decimals are written with exactly two fractional digits. Decoding accepts
//! any finite decimal. Range checks on beliefs belong to the belief store,
//! not to the codec.

use crate::domain::action_state::{ForcedState, INACTIVE_ESTIMATE};
use crate::domain::agent::{AgentId, Tick};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const BELIEF_TAG: &str = "0";
const ACTION_TAG: &str = "1";
const START_CODE: &str = "1";
const STOP_CODE: &str = "0";

/// A decoded wire datum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwarmMessage {
    Belief {
        source: AgentId,
        timestamp: Tick,
        value: f64,
    },
    Action(ForcedState),
}

/// Why an inbound payload was discarded.
#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("payload is not valid UTF-8")]
    NotText,

    #[error("empty payload")]
    Empty,

    #[error("unknown message tag '{0}'")]
    UnknownTag(String),

    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("field '{field}' is not a valid number: '{raw}'")]
    InvalidNumber { field: &'static str, raw: String },

    #[error("unknown action code '{0}'")]
    UnknownActionCode(String),
}

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, CodecError> {
    raw.parse::<T>().map_err(|_| CodecError::InvalidNumber {
        field,
        raw: raw.to_string(),
    })
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, CodecError> {
    let value: f64 = parse_field(field, raw)?;
    if !value.is_finite() {
        return Err(CodecError::InvalidNumber {
            field,
            raw: raw.to_string(),
        });
    }
    Ok(value)
}

fn expect_fields(fields: &[&str], expected: usize) -> Result<(), CodecError> {
    if fields.len() != expected {
        return Err(CodecError::FieldCount {
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

impl SwarmMessage {
    pub fn belief(source: AgentId, timestamp: Tick, value: f64) -> Self {
        Self::Belief {
            source,
            timestamp,
            value,
        }
    }

    /// Action datum reflecting the given action state.
    pub fn action(acting: bool, d: f64) -> Self {
        if acting {
            Self::Action(ForcedState::Start { d })
        } else {
            Self::Action(ForcedState::Stop)
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, CodecError> {
        let text = std::str::from_utf8(payload).map_err(|_| CodecError::NotText)?;
        text.parse()
    }
}

impl fmt::Display for SwarmMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Belief {
                source,
                timestamp,
                value,
            } => write!(f, "{} {} {} {:.2}", BELIEF_TAG, source, timestamp, value),
            Self::Action(ForcedState::Start { d }) => {
                write!(f, "{} {} {:.2}", ACTION_TAG, START_CODE, d)
            }
            Self::Action(ForcedState::Stop) => {
                write!(f, "{} {} {:.2}", ACTION_TAG, STOP_CODE, INACTIVE_ESTIMATE)
            }
        }
    }
}

impl FromStr for SwarmMessage {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let tag = *fields.first().ok_or(CodecError::Empty)?;

        match tag {
            BELIEF_TAG => {
                expect_fields(&fields, 4)?;
                let source: u32 = parse_field("source", fields[1])?;
                let timestamp: Tick = parse_field("timestamp", fields[2])?;
                let value = parse_decimal("belief", fields[3])?;
                Ok(Self::belief(AgentId(source), timestamp, value))
            }
            ACTION_TAG => {
                expect_fields(&fields, 3)?;
                let value = parse_decimal("value", fields[2])?;
                match fields[1] {
                    START_CODE => Ok(Self::Action(ForcedState::Start { d: value })),
                    STOP_CODE => Ok(Self::Action(ForcedState::Stop)),
                    other => Err(CodecError::UnknownActionCode(other.to_string())),
                }
            }
            other => Err(CodecError::UnknownTag(other.to_string())),
        }
    }
}
