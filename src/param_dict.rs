//! Sparse, tagged parameter dictionary parsed from one topology line.
//! Fixed at 32 slots, matching ncnn's `NCNN_MAX_PARAM_COUNT`; `get`/`set`
//! never panic on a missing or mistyped key.

use std::io::BufRead;

use crate::error::{NcnnError, Result};

pub const MAX_PARAM_COUNT: usize = 32;

#[derive(Debug, Clone)]
pub enum ParamValue {
    None,
    Int(i32),
    Float(f32),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct ParamDict {
    values: [ParamValue; MAX_PARAM_COUNT],
}

impl Default for ParamDict {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|_| ParamValue::None),
        }
    }
}

impl ParamDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_int(&self, id: usize, default: i32) -> i32 {
        match &self.values[id] {
            ParamValue::Int(v) => *v,
            _ => default,
        }
    }

    pub fn get_float(&self, id: usize, default: f32) -> f32 {
        match &self.values[id] {
            ParamValue::Float(v) => *v,
            _ => default,
        }
    }

    pub fn get_int_array(&self, id: usize, default: &[i32]) -> Vec<i32> {
        match &self.values[id] {
            ParamValue::IntArray(v) => v.clone(),
            _ => default.to_vec(),
        }
    }

    pub fn get_float_array(&self, id: usize, default: &[f32]) -> Vec<f32> {
        match &self.values[id] {
            ParamValue::FloatArray(v) => v.clone(),
            _ => default.to_vec(),
        }
    }

    pub fn get_str(&self, id: usize, default: &str) -> String {
        match &self.values[id] {
            ParamValue::Str(v) => v.clone(),
            _ => default.to_string(),
        }
    }

    pub fn set(&mut self, id: usize, value: ParamValue) {
        self.values[id] = value;
    }

    /// Parses one `key=value` token and stores it. This crate only
    /// implements the plain numeric/array/string textual encoding; it
    /// does not model ncnn's negative-key string-typing convention.
    fn parse_token(&mut self, token: &str) -> Result<()> {
        let (key_str, value_str) = token
            .split_once('=')
            .ok_or_else(|| NcnnError::MalformedTopology(format!("param token missing '=': {token}")))?;
        let key: usize = key_str
            .parse()
            .map_err(|_| NcnnError::MalformedTopology(format!("bad param key: {key_str}")))?;
        if key >= MAX_PARAM_COUNT {
            return Err(NcnnError::MalformedTopology(format!("param key {key} out of range")));
        }

        if let Some(rest) = value_str.strip_prefix("-233,") {
            let parts: Vec<&str> = rest.split(',').collect();
            if parts.is_empty() {
                return Err(NcnnError::MalformedTopology("empty array value".into()));
            }
            let count: usize = parts[0]
                .parse()
                .map_err(|_| NcnnError::MalformedTopology(format!("bad array length: {}", parts[0])))?;
            let elems = &parts[1..];
            if elems.len() != count {
                return Err(NcnnError::MalformedTopology(format!(
                    "array length {count} does not match {} elements",
                    elems.len()
                )));
            }
            if let Ok(ints) = elems.iter().map(|e| e.parse::<i32>()).collect::<std::result::Result<Vec<_>, _>>() {
                self.set(key, ParamValue::IntArray(ints));
            } else {
                let floats = elems
                    .iter()
                    .map(|e| e.parse::<f32>())
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| NcnnError::MalformedTopology(format!("bad array element in: {rest}")))?;
                self.set(key, ParamValue::FloatArray(floats));
            }
            return Ok(());
        }

        if let Ok(i) = value_str.parse::<i32>() {
            self.set(key, ParamValue::Int(i));
        } else if let Ok(f) = value_str.parse::<f32>() {
            self.set(key, ParamValue::Float(f));
        } else {
            self.set(key, ParamValue::Str(value_str.to_string()));
        }
        Ok(())
    }

    /// Parses the trailing `key=value` tokens of one already-split
    /// topology line (the layer type/name/bottom/top tokens are consumed
    /// by the caller before this is invoked — see `net::parse_topology`).
    pub fn parse_tokens(tokens: &[&str]) -> Result<Self> {
        let mut dict = Self::new();
        for token in tokens {
            dict.parse_token(token)?;
        }
        Ok(dict)
    }
}

/// Convenience entry point for standalone parsing/testing of a single
/// topology line.
pub fn parse_line(mut reader: impl BufRead) -> Result<ParamDict> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    ParamDict::parse_tokens(&tokens)
}
