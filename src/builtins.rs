// ABOUTME: Host functions pre-defined in the global environment

use crate::env::Environment;
use crate::value::{NativeFn, Value};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Install the host functions every program starts with.
pub fn register_builtins(globals: &Rc<Environment>) {
    globals.define(
        "time",
        Value::NativeFn(Rc::new(NativeFn {
            name: "time",
            arity: 0,
            func: native_time,
        })),
    );
    globals.define(
        "str",
        Value::NativeFn(Rc::new(NativeFn {
            name: "str",
            arity: 1,
            func: native_str,
        })),
    );
}

/// `time()` — seconds since the Unix epoch.
fn native_time(_args: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Value::Float(seconds)
}

/// `str(x)` — the printed form of any value; `true`, `false` and `none`
/// keep their lowercase spellings.
fn native_str(args: &[Value]) -> Value {
    match args.first() {
        Some(value) => Value::Str(value.to_string()),
        None => Value::Str(String::new()),
    }
}
