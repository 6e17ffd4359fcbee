//! Runtime tests for structured control flow.
//!
//! Forward branches leave enclosing blocks; backward branches re-enter the
//! body loop and resume through the dispatch table. Both must land on the
//! right instruction for every outcome.

use anyhow::Result;
use ilwasm_tests::{Program, CONTROL};

fn program() -> Result<Program> {
    Program::load(CONTROL)
}

#[test]
fn test_max_first_larger() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::Max(System.Int32,System.Int32)";
    assert_eq!(p.call::<(i32, i32), i32>(f, (100, 50))?, 100);
    Ok(())
}

#[test]
fn test_max_second_larger() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::Max(System.Int32,System.Int32)";
    assert_eq!(p.call::<(i32, i32), i32>(f, (30, 70))?, 70);
    assert_eq!(p.call::<(i32, i32), i32>(f, (42, 42))?, 42);
    Ok(())
}

#[test]
fn test_if_else_both_arms() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::Select(System.Boolean)";
    assert_eq!(p.call::<i32, i32>(f, 1)?, 42);
    assert_eq!(p.call::<i32, i32>(f, 0)?, 99);
    // Any non-zero value is true.
    assert_eq!(p.call::<i32, i32>(f, -3)?, 42);
    Ok(())
}

#[test]
fn test_countdown_loop() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::Countdown(System.Int32)";
    assert_eq!(p.call::<i32, i32>(f, 5)?, 5);
    assert_eq!(p.call::<i32, i32>(f, 0)?, 0);
    assert_eq!(p.call::<i32, i32>(f, -3)?, 0);
    Ok(())
}

#[test]
fn test_nested_loops() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::CountPairs(System.Int32)";
    for n in [0, 1, 2, 5, 10] {
        assert_eq!(p.call::<i32, i32>(f, n)?, n * (n - 1) / 2, "n = {}", n);
    }
    Ok(())
}

#[test]
fn test_backward_branch_to_method_start() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::NextMultiple(System.Int32,System.Int32)";
    assert_eq!(p.call::<(i32, i32), i32>(f, (10, 7))?, 14);
    assert_eq!(p.call::<(i32, i32), i32>(f, (21, 7))?, 21);
    Ok(())
}

#[test]
fn test_switch_cases_and_default() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::Classify(System.Int32)";
    assert_eq!(p.call::<i32, i32>(f, 0)?, 10);
    assert_eq!(p.call::<i32, i32>(f, 1)?, 20);
    assert_eq!(p.call::<i32, i32>(f, 2)?, 30);
    assert_eq!(p.call::<i32, i32>(f, 3)?, -1);
    assert_eq!(p.call::<i32, i32>(f, -1)?, -1);
    Ok(())
}

#[test]
fn test_unsigned_branch() -> Result<()> {
    let mut p = program()?;
    let f = "System.Int32 Control.Flow::Clamp(System.Int32,System.Int32)";
    assert_eq!(p.call::<(i32, i32), i32>(f, (3, 10))?, 3);
    assert_eq!(p.call::<(i32, i32), i32>(f, (12, 10))?, 10);
    assert_eq!(p.call::<(i32, i32), i32>(f, (-1, 10))?, 10);
    Ok(())
}
