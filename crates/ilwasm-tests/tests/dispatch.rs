//! Runtime tests for virtual calls.
//!
//! `callvirt` is bound statically to the method named at the call site, so a
//! call through a base-class reference runs the base implementation.

use anyhow::Result;
use ilwasm_tests::{Program, DISPATCH};

const BIRD_LEGS: &str = "System.Int32 Zoo.Animal::BirdLegs()";

#[test]
fn test_callvirt_binds_to_declared_method() -> Result<()> {
    let mut p = Program::load(DISPATCH)?;
    assert_eq!(p.call::<(), i32>(BIRD_LEGS, ())?, 4);
    assert_eq!(p.state().allocations[0].ty, "Zoo|Zoo.Bird");
    Ok(())
}

#[test]
#[ignore = "callvirt has no runtime dispatch yet"]
fn test_callvirt_dispatches_on_runtime_type() -> Result<()> {
    let mut p = Program::load(DISPATCH)?;
    assert_eq!(p.call::<(), i32>(BIRD_LEGS, ())?, 2);
    Ok(())
}
