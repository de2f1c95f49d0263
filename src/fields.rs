use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<FieldValue>),
    Object(BTreeMap<String, FieldValue>),
}

pub type FieldMap = BTreeMap<String, FieldValue>;

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// A field counts as present only when it is non-empty.
    pub fn is_empty_value(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// String elements of a list value, or the single string itself.
    pub fn string_items(&self) -> Vec<String> {
        match self {
            FieldValue::String(s) => vec![s.clone()],
            FieldValue::List(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

pub fn normalize_field_key(key: &str) -> Option<String> {
    let k = key.trim();
    if k.is_empty() {
        return None;
    }
    Some(k.to_string())
}

pub fn yaml_to_field_value(v: &serde_yaml::Value) -> FieldValue {
    match v {
        serde_yaml::Value::Null => FieldValue::Null,
        serde_yaml::Value::Bool(b) => FieldValue::Bool(*b),
        serde_yaml::Value::Number(n) => FieldValue::Number(n.as_f64().unwrap_or(0.0)),
        serde_yaml::Value::String(s) => FieldValue::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            FieldValue::List(seq.iter().map(yaml_to_field_value).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                let Some(k) = k.as_str().and_then(normalize_field_key) else {
                    continue;
                };
                out.insert(k, yaml_to_field_value(v));
            }
            FieldValue::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_field_value(&tagged.value),
    }
}

pub fn field_value_to_yaml(v: &FieldValue) -> serde_yaml::Value {
    match v {
        FieldValue::Null => serde_yaml::Value::Null,
        FieldValue::Bool(b) => serde_yaml::Value::Bool(*b),
        FieldValue::Number(n) => {
            // Keep whole numbers as integers so `count: 3` survives a rewrite.
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                serde_yaml::Value::Number(serde_yaml::Number::from(*n as i64))
            } else {
                serde_yaml::Value::Number(serde_yaml::Number::from(*n))
            }
        }
        FieldValue::String(s) => serde_yaml::Value::String(s.clone()),
        FieldValue::List(items) => {
            serde_yaml::Value::Sequence(items.iter().map(field_value_to_yaml).collect())
        }
        FieldValue::Object(map) => {
            let mut out = serde_yaml::Mapping::new();
            for (k, v) in map {
                out.insert(
                    serde_yaml::Value::String(k.clone()),
                    field_value_to_yaml(v),
                );
            }
            serde_yaml::Value::Mapping(out)
        }
    }
}

pub fn yaml_mapping_to_field_map(fm: &serde_yaml::Value) -> Option<FieldMap> {
    let map = fm.as_mapping()?;
    let mut out = FieldMap::new();
    for (k, v) in map {
        let Some(key) = k.as_str().and_then(normalize_field_key) else {
            continue;
        };
        out.insert(key, yaml_to_field_value(v));
    }
    Some(out)
}
