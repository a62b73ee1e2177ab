//! Tests for the reference engine

use super::*;

fn capturing() -> Vm {
    let mut vm = Vm::with_config(VmConfig {
        capture_print: true,
        ..VmConfig::default()
    });
    vm.open_libs();
    vm
}

fn run(source: &str) -> Vm {
    let mut vm = capturing();
    vm.exec("test", source).unwrap();
    vm
}

fn printed(source: &str) -> Vec<String> {
    run(source).take_printed()
}

fn runtime_error(source: &str) -> String {
    let mut vm = capturing();
    match vm.exec("test", source).unwrap_err() {
        EngineError::Runtime { message } => message,
        other => panic!("expected runtime error, got {:?}", other),
    }
}

fn double(vm: &mut Vm) -> usize {
    let value = vm.to_integer(1);
    vm.push_integer(value * 2);
    1
}

#[test]
fn test_push_and_read_slots() {
    let mut vm = Vm::new();
    vm.push_integer(42);
    vm.push_float(2.5);
    vm.push_string("hello");

    assert_eq!(vm.top(), 3);
    assert_eq!(vm.to_integer(1), 42);
    assert_eq!(vm.to_float(2), 2.5);
    assert_eq!(vm.to_str(3), "hello");
}

#[test]
fn test_coercions() {
    let mut vm = Vm::new();
    vm.push_string("17");
    vm.push_float(3.0);
    vm.push_float(3.5);
    vm.push_integer(7);
    vm.push_value(Value::Boolean(true));

    assert_eq!(vm.to_integer(1), 17);
    assert_eq!(vm.to_float(1), 17.0);
    assert_eq!(vm.to_integer(2), 3);
    // non-integral floats have no integer view
    assert_eq!(vm.to_integer(3), 0);
    assert_eq!(vm.to_str(3), "3.5");
    assert_eq!(vm.to_str(4), "7");
    assert_eq!(vm.to_str(5), "");
    assert_eq!(vm.to_integer(5), 0);
}

#[test]
fn test_out_of_range_slots() {
    let vm = Vm::new();
    assert_eq!(vm.to_integer(0), 0);
    assert_eq!(vm.to_integer(1), 0);
    assert_eq!(vm.to_float(9), 0.0);
    assert_eq!(vm.to_str(1), "");
}

#[test]
fn test_number_text_is_cached() {
    let mut vm = Vm::new();
    vm.push_float(0.25);
    let first = vm.to_str(1).as_ptr();
    let second = vm.to_str(1).as_ptr();
    assert_eq!(first, second);
}

#[test]
fn test_set_top() {
    let mut vm = Vm::new();
    vm.push_integer(1);
    vm.push_integer(2);
    vm.set_top(4);
    assert_eq!(vm.top(), 4);
    assert!(matches!(vm.value_at(4), Value::Nil));
    vm.set_top(1);
    assert_eq!(vm.top(), 1);
    assert_eq!(vm.to_integer(1), 1);
}

#[test]
fn test_globals() {
    let mut vm = Vm::new();
    vm.push_integer(5);
    vm.set_global("five");
    assert_eq!(vm.top(), 0);

    vm.get_global("five");
    assert_eq!(vm.to_integer(1), 5);
    vm.get_global("missing");
    assert!(matches!(vm.value_at(2), Value::Nil));

    vm.set_top(0);
    vm.push_value(Value::Nil);
    vm.set_global("five");
    assert!(vm.global("five").is_none());
}

#[test]
fn test_call_native() {
    let mut vm = Vm::new();
    vm.push_native(Rc::new(double));
    vm.push_integer(21);
    vm.call(1, 1).unwrap();

    assert_eq!(vm.top(), 1);
    assert_eq!(vm.to_integer(1), 42);
}

#[test]
fn test_call_adjusts_results() {
    let mut vm = Vm::new();
    vm.push_native(Rc::new(double));
    vm.push_integer(1);
    vm.call(1, 0).unwrap();
    assert_eq!(vm.top(), 0);

    vm.push_native(Rc::new(|_: &mut Vm| -> usize { 0 }));
    vm.call(0, 2).unwrap();
    assert_eq!(vm.top(), 2);
    assert!(matches!(vm.value_at(1), Value::Nil));
}

#[test]
fn test_call_errors() {
    let mut vm = Vm::new();
    vm.push_integer(3);
    let err = vm.call(0, 1).unwrap_err();
    assert!(matches!(err, EngineError::NotCallable { type_name: "number" }));
    assert_eq!(err.to_string(), "attempt to call a number value");
    assert_eq!(vm.top(), 0);

    vm.push_integer(1);
    let err = vm.call(3, 1).unwrap_err();
    assert!(matches!(err, EngineError::StackUnderflow { needed: 4, available: 1 }));
}

#[test]
fn test_native_sees_own_frame() {
    let mut vm = Vm::new();
    vm.push_string("below");
    vm.push_native(Rc::new(|vm: &mut Vm| -> usize {
        let count = vm.top() as Integer;
        vm.push_integer(count);
        1
    }));
    vm.push_integer(1);
    vm.push_integer(2);
    vm.call(2, 1).unwrap();

    assert_eq!(vm.top(), 2);
    assert_eq!(vm.to_str(1), "below");
    assert_eq!(vm.to_integer(2), 2);
}

#[test]
fn test_script_function_call() {
    let mut vm = run("function add(a, b)\n  return a + b\nend");
    vm.get_global("add");
    vm.push_integer(2);
    vm.push_integer(3);
    vm.call(2, 1).unwrap();
    assert_eq!(vm.to_integer(1), 5);
}

#[test]
fn test_missing_arguments_are_nil() {
    let lines = printed("function f(a, b)\n  print(a, b)\nend\nf(1)");
    assert_eq!(lines, vec!["1\tnil"]);
}

#[test]
fn test_arithmetic() {
    let lines = printed(
        "print(1 + 2, 7 - 10, 6 * 7)\n\
         print(7 / 2, 6 / 3)\n\
         print(7 % 3, -7 % 3, 7 % -3, 5.5 % 2)\n\
         print(1 + 2.5, '10' + 1, -(3))",
    );
    assert_eq!(
        lines,
        vec!["3\t-3\t42", "3.5\t2.0", "1\t2\t-2\t1.5", "3.5\t11\t-3"]
    );
}

#[test]
fn test_integer_overflow_wraps() {
    let lines = printed("print(9223372036854775807 + 1)");
    assert_eq!(lines, vec!["-9223372036854775808"]);
}

#[test]
fn test_strings_and_comparison() {
    let lines = printed(
        "print('is ' .. 'the' .. ' answer', 1 .. 2, #'hello')\n\
         print(1 < 2, 2 <= 2, 'a' < 'b', 3 > 4, 1 == 1.0, '1' == 1, 1 ~= 2)\n\
         print(not nil, not 0)",
    );
    assert_eq!(
        lines,
        vec![
            "is the answer\t12\t5",
            "true\ttrue\ttrue\tfalse\ttrue\tfalse\ttrue",
            "true\tfalse",
        ]
    );
}

#[test]
fn test_locals_and_scopes() {
    let lines = printed(
        "x = 1\n\
         local y = 2\n\
         if true then\n  local x = 10\n  y = x + y\nend\n\
         print(x, y)",
    );
    assert_eq!(lines, vec!["1\t12"]);
}

#[test]
fn test_if_elseif_else() {
    let source = "function classify(n)\n\
                    if n < 0 then return 'negative'\n\
                    elseif n == 0 then return 'zero'\n\
                    else return 'positive' end\n\
                  end\n\
                  print(classify(-5), classify(0), classify(3))";
    assert_eq!(printed(source), vec!["negative\tzero\tpositive"]);
}

#[test]
fn test_recursion() {
    let source = "function fact(n)\n\
                    if n <= 1 then return 1 end\n\
                    return n * fact(n - 1)\n\
                  end\n\
                  print(fact(10))";
    assert_eq!(printed(source), vec!["3628800"]);
}

#[test]
fn test_stdlib() {
    let lines = printed(
        "print(type(1), type('s'), type(nil), type(print), type(true))\n\
         print(tostring(1.5) .. '!', tonumber('0x10'), tonumber('abc'), tonumber(' 2.5 '))",
    );
    assert_eq!(
        lines,
        vec![
            "number\tstring\tnil\tfunction\tboolean",
            "1.5!\t16\tnil\t2.5",
        ]
    );
}

#[test]
fn test_runtime_errors_carry_location() {
    assert_eq!(
        runtime_error("x = 1\ny = x + nil"),
        "test:2: attempt to perform arithmetic on a nil value"
    );
    assert_eq!(
        runtime_error("undefined_function()"),
        "test:1: attempt to call a nil value (global 'undefined_function')"
    );
    assert_eq!(
        runtime_error("local n = 3\nn()"),
        "test:2: attempt to call a number value (local 'n')"
    );
    assert_eq!(runtime_error("x = 1 < 'a'"), "test:1: attempt to compare number with string");
    assert_eq!(runtime_error("x = 1 % 0"), "test:1: attempt to perform 'n%0'");
    assert_eq!(runtime_error("x = #5"), "test:1: attempt to get length of a number value");
}

#[test]
fn test_syntax_error() {
    let mut vm = Vm::new();
    let err = vm.exec("broken", "function f(\n").unwrap_err();
    match err {
        EngineError::Syntax { chunk, line, .. } => {
            assert_eq!(chunk, "broken");
            assert_eq!(line, 2);
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_stack_overflow() {
    let mut vm = Vm::with_config(VmConfig {
        max_call_depth: 16,
        capture_print: true,
    });
    let err = vm
        .exec("deep", "function loop(n)\n  return loop(n + 1)\nend\nloop(1)")
        .unwrap_err();
    assert!(matches!(err, EngineError::StackOverflow { depth: 16 }));
    assert_eq!(vm.top(), 0);
    assert_eq!(vm.depth(), 0);
}

#[test]
fn test_call_depth_is_capped() {
    let mut vm = Vm::with_config(VmConfig {
        max_call_depth: 1_000_000,
        capture_print: true,
    });
    assert_eq!(vm.config().max_call_depth, MAX_CALL_DEPTH);

    let err = vm
        .exec("deep", "function loop(n)\n  return loop(n + 1)\nend\nloop(1)")
        .unwrap_err();
    assert!(matches!(err, EngineError::StackOverflow { depth: MAX_CALL_DEPTH }));
    assert_eq!(vm.depth(), 0);
}

#[test]
fn test_deep_nesting_is_a_syntax_error() {
    let mut vm = Vm::new();
    let source = format!("x = {}1{}", "(".repeat(1000), ")".repeat(1000));
    match vm.exec("nested", &source).unwrap_err() {
        EngineError::Syntax { chunk, line, message } => {
            assert_eq!(chunk, "nested");
            assert_eq!(line, 1);
            assert_eq!(message, "chunk has too many syntax levels");
        }
        other => panic!("expected syntax error, got {:?}", other),
    }
    assert_eq!(vm.top(), 0);

    let source = format!("x = {}1{}", "(".repeat(100), ")".repeat(100));
    vm.exec("nested", &source).unwrap();
    assert!(matches!(vm.global("x"), Some(Value::Integer(1))));
}

#[test]
fn test_callable_values() {
    let vm = run("function f()\nend\nn = 1");
    assert!(vm.global("f").map_or(false, Value::is_callable));
    assert!(vm.global("print").map_or(false, Value::is_callable));
    assert!(!vm.global("n").map_or(false, Value::is_callable));
    assert!(!Value::Nil.is_callable());
}

#[test]
fn test_error_restores_stack() {
    let mut vm = capturing();
    vm.push_string("keep");
    assert!(vm.exec("test", "x = nil + 1").is_err());
    assert_eq!(vm.top(), 1);
    assert_eq!(vm.to_str(1), "keep");
}

#[test]
fn test_print_to_capture_buffer() {
    let mut vm = run("print('a')\nprint(1, 2.0, nil)");
    assert_eq!(vm.printed(), ["a", "1\t2.0\tnil"]);
    vm.take_printed();
    assert!(vm.printed().is_empty());
}

#[test]
fn test_parse_number() {
    assert!(matches!(parse_number("42"), Some(Value::Integer(42))));
    assert!(matches!(parse_number("-0x1F"), Some(Value::Integer(-31))));
    assert!(matches!(parse_number("1e3"), Some(Value::Float(v)) if v == 1000.0));
    assert!(matches!(parse_number(".5"), Some(Value::Float(v)) if v == 0.5));
    assert!(parse_number("inf").is_none());
    assert!(parse_number("nan").is_none());
    assert!(parse_number("").is_none());
    assert!(parse_number("12abc").is_none());
}

#[test]
fn test_format_number() {
    assert_eq!(format_number(3.0), "3.0");
    assert_eq!(format_number(-0.5), "-0.5");
    assert_eq!(format_number(0.1 + 0.2), "0.3");
    assert_eq!(format_number(100.0), "100.0");
    assert_eq!(format_number(-0.0), "-0.0");
    assert_eq!(format_number(1e14), "1e+14");
    assert_eq!(format_number(1e20), "1e+20");
    assert_eq!(format_number(1e100), "1e+100");
    assert_eq!(format_number(0.0001), "0.0001");
    assert_eq!(format_number(0.00001), "1e-05");
    assert_eq!(format_number(2.5e-10), "2.5e-10");
    assert_eq!(format_number(3.14159265358979), "3.1415926535898");
    assert_eq!(format_number(f64::INFINITY), "inf");
}

#[test]
fn test_float_text_uses_fourteen_digits() {
    let lines = printed("print(0.1 + 0.2, (0.1 + 0.2) .. '', 1 / 3)");
    assert_eq!(lines, vec!["0.3\t0.3\t0.33333333333333"]);

    let mut vm = Vm::new();
    vm.push_float(0.1 + 0.2);
    assert_eq!(vm.to_str(1), "0.3");
}
