// SPDX-License-Identifier: MIT

//! Deep merge for workflow document trees
//!
//! Imports and templates are combined into a document by structural merge:
//! mappings merge recursively, sequences concatenate (or merge by `name`
//! when both sides are lists of named objects), scalars override. Keys in
//! `overwrite` always replace; scalar keys in `skip` are never copied from
//! the source.

use serde_json::Value;

/// Keys whose values are always replaced rather than merged
pub const OVERWRITE_KEYS: &[&str] = &[];

/// Keys whose scalar values survive a merge untouched
pub const SKIP_KEYS: &[&str] = &["doc"];

/// Deep-merge `src` into `target`
pub fn deep_update(target: &mut Value, src: &Value, overwrite: &[&str], skip: &[&str]) {
    match (target, src) {
        (Value::Object(target_map), Value::Object(src_map)) => {
            for (key, src_value) in src_map {
                if overwrite.contains(&key.as_str()) {
                    target_map.insert(key.clone(), src_value.clone());
                    continue;
                }
                match src_value {
                    Value::Array(_) | Value::Object(_) => match target_map.get_mut(key) {
                        Some(existing) => deep_update(existing, src_value, overwrite, skip),
                        None => {
                            target_map.insert(key.clone(), src_value.clone());
                        }
                    },
                    _ => {
                        if !skip.contains(&key.as_str()) {
                            target_map.insert(key.clone(), src_value.clone());
                        }
                    }
                }
            }
        }
        (Value::Array(target_list), Value::Array(src_list)) => {
            if is_named_list(target_list) && is_named_list(src_list) {
                merge_named_lists(target_list, src_list, overwrite, skip);
            } else {
                target_list.extend(src_list.iter().cloned());
            }
        }
        (target_slot, src_value) => {
            *target_slot = src_value.clone();
        }
    }
}

/// True when every element is an object carrying a `name` key
fn is_named_list(list: &[Value]) -> bool {
    !list.is_empty()
        && list
            .iter()
            .all(|v| v.as_object().map(|o| o.contains_key("name")).unwrap_or(false))
}

fn merge_named_lists(target: &mut Vec<Value>, src: &[Value], overwrite: &[&str], skip: &[&str]) {
    for src_element in src {
        let name = src_element["name"].clone();
        match target
            .iter_mut()
            .find(|t| t.get("name") == Some(&name))
        {
            Some(existing) => deep_update(existing, src_element, overwrite, skip),
            None => target.push(src_element.clone()),
        }
    }
}
