//! Built-in string instance methods (§4.5.6).
//!
//! `print`/`assert`/`string`/`type` are small enough that `eval.rs` handles
//! them inline at the call site; the `String` virtual method surface is
//! bigger and is more readable pulled out on its own.

use crate::value::{EscrString, Value};

/// Dispatches `receiver.name(args)` for the String instance methods listed
/// in §4.5.6. Returns `None` if `name` isn't one of them, so the caller can
/// fall back to reporting "no such method".
pub fn call_string_method(receiver: &EscrString, name: &str, args: &[Value]) -> Option<Result<Value, String>> {
    let s = receiver.as_str();
    let chars: Vec<char> = s.chars().collect();

    Some(match name {
        "hashCode" => {
            use std::hash::{Hash, Hasher};
            let mut hasher = rustc_hash::FxHasher::default();
            s.hash(&mut hasher);
            Ok(Value::Int(hasher.finish() as i64))
        }
        "toString" => Ok(Value::String(receiver.clone())),
        "contains" => with_str_arg(args, 0, "contains", |needle| Ok(Value::Bool(s.contains(needle)))),
        "compare" => with_str_arg(args, 0, "compare", |other| Ok(Value::Int(s.cmp(other) as i64))),
        "startsWith" => with_str_arg(args, 0, "startsWith", |needle| Ok(Value::Bool(s.starts_with(needle)))),
        "endsWith" => with_str_arg(args, 0, "endsWith", |needle| Ok(Value::Bool(s.ends_with(needle)))),
        "indexOf" => with_str_arg(args, 0, "indexOf", |needle| {
            Ok(Value::Int(char_index_of(&chars, needle).map(|i| i as i64).unwrap_or(-1)))
        }),
        "lastIndexOf" => with_str_arg(args, 0, "lastIndexOf", |needle| {
            Ok(Value::Int(char_last_index_of(&chars, needle).map(|i| i as i64).unwrap_or(-1)))
        }),
        "join" => {
            let parts: Vec<String> = args.iter().map(|a| a.display_string()).collect();
            Ok(Value::string(parts.join(s)))
        }
        "split" => with_str_arg(args, 0, "split", |sep| {
            let parts: Vec<String> = if sep.is_empty() {
                chars.iter().map(|c| c.to_string()).collect()
            } else {
                s.split(sep).map(str::to_string).collect()
            };
            Ok(Value::Object(crate::object::VanillaObject::array(
                parts.into_iter().map(Value::string).collect(),
            )))
        }),
        "slice" => slice(&chars, args),
        "repeat" => with_int_arg(args, 0, "repeat", |n| {
            if n < 0 {
                Err("'repeat' count must not be negative".to_string())
            } else {
                Ok(Value::string(s.repeat(n as usize)))
            }
        }),
        "replace" => replace(s, args),
        "padLeft" => pad(&chars, args, true),
        "padRight" => pad(&chars, args, false),
        _ => return None,
    })
}

/// `.length` is a computed property, not a method call (§4.5.6).
pub fn string_length(receiver: &EscrString) -> Value {
    Value::Int(receiver.char_len() as i64)
}

fn with_str_arg(args: &[Value], index: usize, method: &str, f: impl FnOnce(&str) -> Result<Value, String>) -> Result<Value, String> {
    match args.get(index) {
        Some(Value::String(s)) => f(s.as_str()),
        _ => Err(format!("'{method}' expects a string argument")),
    }
}

fn with_int_arg(args: &[Value], index: usize, method: &str, f: impl FnOnce(i64) -> Result<Value, String>) -> Result<Value, String> {
    match args.get(index) {
        Some(Value::Int(i)) => f(*i),
        _ => Err(format!("'{method}' expects an int argument")),
    }
}

fn char_index_of(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle.as_slice())
}

fn char_last_index_of(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return Some(haystack.len());
    }
    haystack.windows(needle.len()).rposition(|w| w == needle.as_slice())
}

fn slice(chars: &[char], args: &[Value]) -> Result<Value, String> {
    let len = chars.len() as i64;
    let begin = match args.first() {
        Some(Value::Int(i)) => *i,
        _ => return Err("'slice' expects an int 'begin' argument".to_string()),
    };
    let end = match args.get(1) {
        Some(Value::Int(i)) => *i,
        None => len,
        _ => return Err("'slice' expects an int 'end' argument".to_string()),
    };
    let clamp = |i: i64| -> usize {
        let i = if i < 0 { (len + i).max(0) } else { i.min(len) };
        i as usize
    };
    let (begin, end) = (clamp(begin), clamp(end));
    if begin >= end {
        return Ok(Value::string(""));
    }
    Ok(Value::string(chars[begin..end].iter().collect::<String>()))
}

fn replace(s: &str, args: &[Value]) -> Result<Value, String> {
    let (Some(Value::String(needle)), Some(Value::String(repl))) = (args.first(), args.get(1)) else {
        return Err("'replace' expects (needle, replacement) string arguments".to_string());
    };
    match args.get(2) {
        Some(Value::Int(count)) => Ok(Value::string(s.replacen(needle.as_str(), repl.as_str(), (*count).max(0) as usize))),
        None => Ok(Value::string(s.replace(needle.as_str(), repl.as_str()))),
        _ => Err("'replace' count must be an int".to_string()),
    }
}

fn pad(chars: &[char], args: &[Value], left: bool) -> Result<Value, String> {
    let Some(Value::Int(target_len)) = args.first() else {
        return Err("pad expects an int 'length' argument".to_string());
    };
    let pad_char = match args.get(1) {
        Some(Value::String(s)) => s.as_str().chars().next().unwrap_or(' '),
        None => ' ',
        _ => return Err("pad's fill argument must be a string".to_string()),
    };
    let target_len = (*target_len).max(0) as usize;
    if chars.len() >= target_len {
        return Ok(Value::string(chars.iter().collect::<String>()));
    }
    let padding: String = std::iter::repeat(pad_char).take(target_len - chars.len()).collect();
    let original: String = chars.iter().collect();
    Ok(Value::string(if left { format!("{padding}{original}") } else { format!("{original}{padding}") }))
}
