//! Operation labels: the compact identifier attached to every enriched row.
//!
//! Grammar:
//! - loan row: `D{cycle}E{loan_seq}SVE{streak}`
//! - repayment row: `D{cycle}[A..][L{cycle}]SVR{streak}`
//! - neutral row: `S0`
//!
//! Amortized loans render as `A3` (one id), `A1:A3` (contiguous run) or
//! `A1,A4` (anything else).

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationLabel {
    Loan {
        cycle: u64,
        loan_seq: u32,
        streak: u32,
    },
    Repayment {
        cycle: u64,
        amortized: Vec<u32>,
        profit_cycle: Option<u64>,
        streak: u32,
    },
    Neutral,
}

/// What kind of activity a label records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelFlags {
    pub loan: bool,
    pub amortization: bool,
    pub profit: bool,
}

impl LabelFlags {
    /// A row counts as an operation if it records any activity.
    pub fn is_operation(&self) -> bool {
        self.loan || self.amortization || self.profit
    }
}

impl OperationLabel {
    pub fn flags(&self) -> LabelFlags {
        match self {
            OperationLabel::Loan { .. } => LabelFlags {
                loan: true,
                ..LabelFlags::default()
            },
            OperationLabel::Repayment {
                amortized,
                profit_cycle,
                ..
            } => LabelFlags {
                loan: false,
                amortization: !amortized.is_empty(),
                profit: profit_cycle.is_some(),
            },
            OperationLabel::Neutral => LabelFlags::default(),
        }
    }
}

/// Render amortized loan ids as a compact tag (empty when none).
pub fn format_amortization(ids: &[u32]) -> String {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    match sorted.as_slice() {
        [] => String::new(),
        [first, .., last] if (*last - *first) as usize == sorted.len() - 1 => {
            format!("A{}:A{}", first, last)
        }
        _ => sorted
            .iter()
            .map(|id| format!("A{}", id))
            .collect::<Vec<_>>()
            .join(","),
    }
}

impl fmt::Display for OperationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationLabel::Loan {
                cycle,
                loan_seq,
                streak,
            } => write!(f, "D{}E{}SVE{}", cycle, loan_seq, streak),
            OperationLabel::Repayment {
                cycle,
                amortized,
                profit_cycle,
                streak,
            } => {
                write!(f, "D{}{}", cycle, format_amortization(amortized))?;
                if let Some(l) = profit_cycle {
                    write!(f, "L{}", l)?;
                }
                write!(f, "SVR{}", streak)
            }
            OperationLabel::Neutral => write!(f, "S0"),
        }
    }
}

impl Serialize for OperationLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid operation label {label:?}: {reason}")]
pub struct LabelParseError {
    pub label: String,
    pub reason: &'static str,
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn number<T: FromStr>(&mut self) -> Option<T> {
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }
        let (digits, rest) = self.rest.split_at(end);
        self.rest = rest;
        digits.parse().ok()
    }

    fn peek(&self, token: &str) -> bool {
        self.rest.starts_with(token)
    }
}

impl FromStr for OperationLabel {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| LabelParseError {
            label: s.to_string(),
            reason,
        };
        if s == "S0" {
            return Ok(OperationLabel::Neutral);
        }

        let mut cur = Cursor { rest: s };
        if !cur.eat("D") {
            return Err(fail("expected D tag"));
        }
        let cycle = cur.number().ok_or_else(|| fail("expected cycle id"))?;

        if cur.eat("E") {
            let loan_seq = cur.number().ok_or_else(|| fail("expected loan id"))?;
            if !cur.eat("SVE") {
                return Err(fail("expected SVE tag"));
            }
            let streak = cur.number().ok_or_else(|| fail("expected streak id"))?;
            if !cur.rest.is_empty() {
                return Err(fail("trailing characters"));
            }
            return Ok(OperationLabel::Loan {
                cycle,
                loan_seq,
                streak,
            });
        }

        let mut amortized = Vec::new();
        if cur.peek("A") {
            loop {
                if !cur.eat("A") {
                    return Err(fail("expected A tag"));
                }
                let first: u32 = cur.number().ok_or_else(|| fail("expected loan id"))?;
                if cur.eat(":") {
                    if !cur.eat("A") {
                        return Err(fail("expected A tag"));
                    }
                    let last: u32 = cur.number().ok_or_else(|| fail("expected loan id"))?;
                    if last < first {
                        return Err(fail("descending amortization range"));
                    }
                    amortized.extend(first..=last);
                } else {
                    amortized.push(first);
                }
                if !cur.eat(",") {
                    break;
                }
            }
        }

        let profit_cycle = if cur.eat("L") {
            Some(cur.number().ok_or_else(|| fail("expected profit cycle id"))?)
        } else {
            None
        };

        if !cur.eat("SVR") {
            return Err(fail("expected SVR tag"));
        }
        let streak = cur.number().ok_or_else(|| fail("expected streak id"))?;
        if !cur.rest.is_empty() {
            return Err(fail("trailing characters"));
        }

        Ok(OperationLabel::Repayment {
            cycle,
            amortized,
            profit_cycle,
            streak,
        })
    }
}
