// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Broadcast Planning Module
//!
//! Decides, from ranks alone, which operands advance along which axis.
//!
//! ## Model
//! Each operand carries `rank_diff = operand_rank - param_rank` extra axes.
//! The expression rank `R` is the largest diff, leaving out the receiver of a
//! bound call unless it is the only operand. Levels are visited outermost
//! first, counting `L = R, R-1, .., 1`; at each level an operand is reduced
//! when it still has extra axes and enough remaining rank to reach that level:
//!
//! `remaining_diff > 0 && remaining_rank >= L`
//!
//! Operands with scalar parameters therefore line up on their trailing axes,
//! while operands with array parameters give up their leading axes and keep
//! the trailing ones for the call. An operand left with extra axes after the
//! last level cannot be reduced, which rejects the expression.
//!
//! ## Axis sizes
//! The extent of an axis is the first participating extent that is not 1;
//! extents of 1 broadcast and are always read at offset 0.

use std::borrow::Cow;

use crate::enums::error::{Incompatibility, LazyError};
use crate::enums::value::Value;
use crate::kernels::access::{axis_size, element_at};

/// Participation table of one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPlan {
    rank: usize,
    rank_diffs: Vec<usize>,
    /// `participation[level][operand]`, outermost level first.
    participation: Vec<Vec<bool>>,
}

impl BroadcastPlan {
    /// Plans an expression over operands of `operand_ranks` for parameters
    /// of `param_ranks`.
    pub fn new(param_ranks: &[i32], operand_ranks: &[i32], bound: bool) -> Result<Self, LazyError> {
        if param_ranks.len() != operand_ranks.len() {
            return Err(Incompatibility::Arity {
                expected: param_ranks.len(),
                found: operand_ranks.len(),
            }
            .into());
        }
        let mut rank_diffs = Vec::with_capacity(operand_ranks.len());
        for (operand, (&param, &found)) in param_ranks.iter().zip(operand_ranks).enumerate() {
            if found < param {
                return Err(Incompatibility::RankDeficit {
                    operand,
                    expected: param,
                    found,
                }
                .into());
            }
            rank_diffs.push((found - param) as usize);
        }

        let skip_receiver = bound && rank_diffs.len() > 1;
        let rank = rank_diffs
            .iter()
            .enumerate()
            .filter(|(i, _)| !(skip_receiver && *i == 0))
            .map(|(_, d)| *d)
            .max()
            .unwrap_or(0);

        let mut remaining_rank: Vec<i64> = operand_ranks.iter().map(|&r| r as i64).collect();
        let mut remaining_diff = rank_diffs.clone();
        let mut participation = Vec::with_capacity(rank);
        for level in (1..=rank).rev() {
            let row: Vec<bool> = remaining_diff
                .iter()
                .zip(&remaining_rank)
                .map(|(&diff, &r)| diff > 0 && r >= level as i64)
                .collect();
            for (i, &takes) in row.iter().enumerate() {
                if takes {
                    remaining_diff[i] -= 1;
                    remaining_rank[i] -= 1;
                }
            }
            participation.push(row);
        }

        if let Some((operand, &remaining)) = remaining_diff.iter().enumerate().find(|(_, d)| **d > 0) {
            return Err(Incompatibility::Unreduced { operand, remaining }.into());
        }

        Ok(BroadcastPlan {
            rank,
            rank_diffs,
            participation,
        })
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn rank_diffs(&self) -> &[usize] {
        &self.rank_diffs
    }

    /// Participation row of `level`, counted from the outermost axis.
    #[inline]
    pub fn participation(&self, level: usize) -> &[bool] {
        &self.participation[level]
    }

    #[inline]
    pub fn participates(&self, level: usize, operand: usize) -> bool {
        self.participation
            .get(level)
            .and_then(|row| row.get(operand))
            .copied()
            .unwrap_or(false)
    }

    /// Extent of axis `level` over the operands as reduced so far.
    pub fn axis_size(&self, level: usize, operands: &[Cow<'_, Value>]) -> Result<usize, LazyError> {
        let Some(row) = self.participation.get(level) else {
            return Ok(1);
        };
        for (op, _) in operands.iter().zip(row).filter(|(_, takes)| **takes) {
            let size = axis_size(op)?;
            if size != 1 {
                return Ok(size);
            }
        }
        Ok(1)
    }

    /// Plan of a slice along the outermost axis.
    pub fn descend(&self) -> BroadcastPlan {
        let Some(first) = self.participation.first() else {
            return self.clone();
        };
        BroadcastPlan {
            rank: self.rank - 1,
            rank_diffs: self
                .rank_diffs
                .iter()
                .zip(first)
                .map(|(&d, &takes)| if takes { d - 1 } else { d })
                .collect(),
            participation: self.participation[1..].to_vec(),
        }
    }

    /// Checks that every axis resolves to one extent.
    ///
    /// Walks one representative element per level. Operands are checked for
    /// rectangularity separately, so the first element stands for all.
    pub fn validate(&self, operands: &[Value]) -> Result<(), LazyError> {
        let roots: Vec<Cow<'_, Value>> = operands.iter().map(Cow::Borrowed).collect();
        self.validate_level(0, &roots)
    }

    fn validate_level(&self, level: usize, operands: &[Cow<'_, Value>]) -> Result<(), LazyError> {
        if level == self.rank {
            return Ok(());
        }
        let row = &self.participation[level];
        let mut resolved: Option<usize> = None;
        for (operand, op) in operands.iter().enumerate().filter(|(i, _)| row[*i]) {
            let size = axis_size(op)?;
            match resolved {
                _ if size == 1 => {}
                None => resolved = Some(size),
                Some(expected) if expected != size => {
                    return Err(Incompatibility::Broadcast {
                        operand,
                        axis: level,
                        expected,
                        found: size,
                    }
                    .into());
                }
                Some(_) => {}
            }
        }
        // Stepping into the innermost axis would evaluate nested expressions.
        if resolved == Some(0) || level + 1 == self.rank {
            return Ok(());
        }
        let next = operands
            .iter()
            .zip(row)
            .map(|(op, &takes)| {
                if takes {
                    element_at(op, 0)
                } else {
                    Ok(Cow::Borrowed(&**op))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.validate_level(level + 1, &next)
    }
}
