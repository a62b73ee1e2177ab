//! Built-in globals: `print`, `tostring`, `tonumber`, `type`

use super::{Value, Vm};
use crate::engine::{Engine, NativeEntry};
use std::rc::Rc;

pub(super) fn open(vm: &mut Vm) {
    install(vm, "print", Rc::new(print));
    install(vm, "tostring", Rc::new(tostring));
    install(vm, "tonumber", Rc::new(tonumber));
    install(vm, "type", Rc::new(type_of));
}

fn install(vm: &mut Vm, name: &str, entry: NativeEntry<Vm>) {
    vm.push_native(entry);
    vm.set_global(name);
}

/// Arguments joined by tabs, one line per call
fn print(vm: &mut Vm) -> usize {
    let line = (1..=vm.top())
        .map(|slot| vm.value_at(slot).to_string())
        .collect::<Vec<_>>()
        .join("\t");
    vm.record_print(line);
    0
}

fn tostring(vm: &mut Vm) -> usize {
    let text = vm.value_at(1).to_string();
    vm.push_string(&text);
    1
}

/// Number for numeric values and numeric text, nil otherwise
fn tonumber(vm: &mut Vm) -> usize {
    let value = vm.value_at(1).to_numeric().unwrap_or(Value::Nil);
    vm.push_value(value);
    1
}

fn type_of(vm: &mut Vm) -> usize {
    let name = vm.value_at(1).type_name();
    vm.push_string(name);
    1
}
