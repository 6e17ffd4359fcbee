//! Control-Flow Structurer.
//!
//! Every distinct branch target of a method becomes one schedule entry, and
//! every schedule entry becomes one `block` opened at function entry inside
//! a single `loop`:
//!
//! ```text
//! loop                       ;; re-entered by backward branches
//!   block                    ;; closes at schedule[N-1]
//!     ...
//!       block                ;; closes at schedule[0]
//!         block              ;; resume dispatch
//!           local.get jumpTarget
//!           br_table 0 1 .. N-1 N
//!         end
//!         <instructions up to schedule[0]>
//!       end
//!       <instructions up to schedule[1]>
//!     ...
//!   end
//! end
//! ```
//!
//! The blocks close in schedule order as the instruction cursor advances, so
//! a forward branch to schedule position `t` while `next` regions have
//! already closed breaks out of `t - next` regions. A backward branch stores
//! `t + 1` in the resume selector and breaks to the loop; the dispatch table
//! then breaks out of `t + 1` regions, landing at `schedule[t]`.

use crate::error::CompileError;
use crate::il::{MethodBody, OpCode, Operand};
use std::collections::BTreeSet;

/// Sorted, duplicate-free branch targets of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSchedule {
    targets: Vec<u32>,
}

impl TargetSchedule {
    pub fn analyze(body: &MethodBody) -> Result<Self, CompileError> {
        if let Some(region) = body.exception_regions.first() {
            return Err(CompileError::control_flow(format!(
                "exception region IL_{:04x}..IL_{:04x} cannot be structured",
                region.try_start, region.try_end
            )));
        }

        for pair in body.instructions.windows(2) {
            if pair[1].offset <= pair[0].offset {
                return Err(CompileError::control_flow(format!(
                    "instruction offsets are not ascending at IL_{:04x}",
                    pair[1].offset
                )));
            }
        }

        let mut targets = BTreeSet::new();
        for instr in &body.instructions {
            match (&instr.operand, instr.opcode) {
                (Operand::Target(t), op) if op.is_branch() => {
                    targets.insert(*t);
                }
                (Operand::Targets(ts), OpCode::Switch) => {
                    targets.extend(ts.iter().copied());
                }
                (_, op) if op.is_branch() || op == OpCode::Switch => {
                    return Err(CompileError::MalformedOperand {
                        opcode: op.mnemonic().to_string(),
                        detail: format!("expected branch target(s), found {:?}", instr.operand),
                    });
                }
                _ => {}
            }
        }

        for t in &targets {
            if body
                .instructions
                .binary_search_by_key(t, |i| i.offset)
                .is_err()
            {
                return Err(CompileError::control_flow(format!(
                    "branch target IL_{:04x} is not an instruction offset",
                    t
                )));
            }
        }

        Ok(Self {
            targets: targets.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    pub fn position(&self, target: u32) -> Result<usize, CompileError> {
        self.targets.binary_search(&target).map_err(|_| {
            CompileError::control_flow(format!(
                "branch target IL_{:04x} is missing from the schedule",
                target
            ))
        })
    }
}

/// How to reach a branch target from the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDepth {
    /// Break out of this many regions.
    Forward(u32),
    /// Store `resume` in the resume selector, then break `depth` regions to
    /// the loop wrapper.
    Backward { resume: i32, depth: u32 },
}

/// Tracks which schedule entries the instruction walk has passed.
#[derive(Debug)]
pub struct RegionCursor<'a> {
    schedule: &'a TargetSchedule,
    next: usize,
}

impl<'a> RegionCursor<'a> {
    pub fn new(schedule: &'a TargetSchedule) -> Self {
        Self { schedule, next: 0 }
    }

    /// Move to the instruction at `offset`; returns how many regions end
    /// before it.
    pub fn advance_to(&mut self, offset: u32) -> usize {
        let start = self.next;
        while self.next < self.schedule.len() && self.schedule.targets[self.next] <= offset {
            self.next += 1;
        }
        self.next - start
    }

    /// Blocks still open, excluding the loop wrapper.
    pub fn open_regions(&self) -> usize {
        self.schedule.len() - self.next
    }

    pub fn depth(&self, target: u32) -> Result<BranchDepth, CompileError> {
        let t = self.schedule.position(target)?;
        if t >= self.next {
            Ok(BranchDepth::Forward((t - self.next) as u32))
        } else {
            Ok(BranchDepth::Backward {
                resume: (t + 1) as i32,
                depth: self.open_regions() as u32,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{ExceptionRegion, Instruction};

    fn body(instrs: Vec<Instruction>) -> MethodBody {
        MethodBody {
            locals: vec![],
            instructions: instrs,
            exception_regions: vec![],
        }
    }

    /// Mirrors a counting loop: 0: br 8; 2: nop; 4: nop; 8: blt 2; 10: ret
    fn loop_body() -> MethodBody {
        body(vec![
            Instruction::new(0, OpCode::BrS, Operand::Target(8)),
            Instruction::simple(2, OpCode::Nop),
            Instruction::simple(4, OpCode::Nop),
            Instruction::new(8, OpCode::BltS, Operand::Target(2)),
            Instruction::simple(10, OpCode::Ret),
        ])
    }

    #[test]
    fn schedule_is_sorted_and_deduplicated() {
        let b = body(vec![
            Instruction::new(0, OpCode::Switch, Operand::Targets(vec![6, 4, 6])),
            Instruction::new(2, OpCode::BrS, Operand::Target(4)),
            Instruction::simple(4, OpCode::Nop),
            Instruction::simple(6, OpCode::Ret),
        ]);
        let s = TargetSchedule::analyze(&b).unwrap();
        assert_eq!(s.targets(), &[4, 6]);
    }

    #[test]
    fn forward_and_backward_depths() {
        let b = loop_body();
        let s = TargetSchedule::analyze(&b).unwrap();
        assert_eq!(s.targets(), &[2, 8]);

        let mut cursor = RegionCursor::new(&s);
        assert_eq!(cursor.advance_to(0), 0);
        assert_eq!(cursor.depth(8).unwrap(), BranchDepth::Forward(1));
        assert_eq!(cursor.depth(2).unwrap(), BranchDepth::Forward(0));

        assert_eq!(cursor.advance_to(2), 1);
        assert_eq!(cursor.advance_to(4), 0);
        assert_eq!(cursor.advance_to(8), 1);
        assert_eq!(cursor.open_regions(), 0);
        assert_eq!(
            cursor.depth(2).unwrap(),
            BranchDepth::Backward {
                resume: 1,
                depth: 0
            }
        );
    }

    #[test]
    fn several_targets_passed_at_once_close_together() {
        let b = body(vec![
            Instruction::new(0, OpCode::Switch, Operand::Targets(vec![1, 3])),
            Instruction::simple(5, OpCode::Ret),
        ]);
        // 1 and 3 are not instruction offsets.
        assert!(matches!(
            TargetSchedule::analyze(&b),
            Err(CompileError::ControlFlow { .. })
        ));

        let s = TargetSchedule {
            targets: vec![1, 3],
        };
        let mut cursor = RegionCursor::new(&s);
        assert_eq!(cursor.advance_to(5), 2);
    }

    #[test]
    fn exception_regions_are_rejected() {
        let mut b = loop_body();
        b.exception_regions.push(ExceptionRegion {
            try_start: 0,
            try_end: 8,
            handler_start: 8,
            handler_end: 10,
        });
        assert!(matches!(
            TargetSchedule::analyze(&b),
            Err(CompileError::ControlFlow { .. })
        ));
    }

    #[test]
    fn descending_offsets_are_rejected() {
        let b = body(vec![
            Instruction::simple(2, OpCode::Nop),
            Instruction::simple(1, OpCode::Ret),
        ]);
        assert!(matches!(
            TargetSchedule::analyze(&b),
            Err(CompileError::ControlFlow { .. })
        ));
    }

    #[test]
    fn unknown_target_has_no_position() {
        let s = TargetSchedule::analyze(&loop_body()).unwrap();
        let cursor = RegionCursor::new(&s);
        assert!(matches!(
            cursor.depth(4),
            Err(CompileError::ControlFlow { .. })
        ));
    }
}
