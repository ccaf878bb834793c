// File: src/builtins.rs
//
// Native functions for the Moss standard library. Natives receive their
// arguments as a slice and return a plain value; they run synchronously
// on the VM thread and never open a call frame.

use once_cell::sync::Lazy;
use rand::Rng;
use std::time::Instant;

use crate::value::Value;
use crate::vm::Vm;

/// Process epoch for `clock()`; pinned on first use.
static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Registers every native into the VM's globals.
pub fn install(vm: &mut Vm) {
    Lazy::force(&START);
    vm.define_native("clock", clock);
    vm.define_native("random", random);
    vm.define_native("sqrt", sqrt);
}

/// Seconds since the process started, as a double.
fn clock(_args: &[Value]) -> Value {
    Value::Number(START.elapsed().as_secs_f64())
}

/// Uniform double in [0, 1).
fn random(_args: &[Value]) -> Value {
    Value::Number(rand::thread_rng().gen::<f64>())
}

fn sqrt(args: &[Value]) -> Value {
    match args.first() {
        Some(Value::Number(n)) => Value::Number(n.sqrt()),
        _ => Value::Nil,
    }
}
