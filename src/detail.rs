//! Detail view of a single promise record

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::{Promise, PromiseState, Role, TAG_SCOPE, Value, function_name};

const TAG_NAMESPACE: &str = "resonate:";

/// Body of a param or value as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum DataView {
    Empty,
    /// Base64 decoded body
    Decoded(String),
    /// Body that is not valid base64, shown as stored
    Raw(String),
}

impl DataView {
    pub fn of(value: &Value) -> Self {
        match value.data.as_deref() {
            None | Some("") => DataView::Empty,
            Some(data) => match value.decode_bytes() {
                Some(bytes) => DataView::Decoded(String::from_utf8_lossy(&bytes).into_owned()),
                None => DataView::Raw(data.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueDetail {
    pub headers: BTreeMap<String, String>,
    pub data: DataView,
}

impl ValueDetail {
    fn of(value: Option<&Value>) -> Self {
        match value {
            Some(value) => ValueDetail {
                headers: value
                    .headers
                    .iter()
                    .flatten()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                data: DataView::of(value),
            },
            None => ValueDetail {
                headers: BTreeMap::new(),
                data: DataView::Empty,
            },
        }
    }
}

/// Everything the `show` command prints for one promise
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromiseDetail {
    pub id: String,
    pub state: PromiseState,
    pub role: Role,
    pub timeout: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_on: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub param: ValueDetail,
    pub value: ValueDetail,
    pub tags: BTreeMap<String, String>,
}

impl PromiseDetail {
    pub fn from_promise(promise: &Promise) -> Self {
        PromiseDetail {
            id: promise.id.clone(),
            state: promise.state,
            role: promise.role(),
            timeout: promise.timeout,
            created_on: promise.created_on,
            completed_on: promise.completed_on,
            function_name: function_name(promise),
            scope: promise.tag(TAG_SCOPE).map(str::to_string),
            param: ValueDetail::of(promise.param.as_ref()),
            value: ValueDetail::of(promise.value.as_ref()),
            tags: promise
                .tags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Format a timeout in milliseconds using the largest whole unit below it.
pub fn format_timeout(ms: i64) -> String {
    let secs = ms / 1_000;
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3_600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3_600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

/// Absolute UTC time, with a short age suffix for the last day.
pub fn format_timestamp(ms: Option<i64>, now: i64) -> String {
    let Some(ms) = ms else {
        return "-".to_string();
    };
    let Some(time) = DateTime::<Utc>::from_timestamp_millis(ms) else {
        return ms.to_string();
    };
    let absolute = time.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let ago = (now - ms) / 1_000;
    match ago {
        0..60 => format!("{} ({}s ago)", absolute, ago),
        60..3_600 => format!("{} ({}m ago)", absolute, ago / 60),
        3_600..86_400 => format!("{} ({}h ago)", absolute, ago / 3_600),
        _ => absolute,
    }
}

fn render_value(out: &mut String, title: &str, detail: &ValueDetail) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", title);
    if detail.headers.is_empty() && detail.data == DataView::Empty {
        let _ = writeln!(out, "  (empty)");
        return;
    }
    if !detail.headers.is_empty() {
        let _ = writeln!(out, "  Headers:");
        for (k, v) in &detail.headers {
            let _ = writeln!(out, "    {}: {}", k, v);
        }
    }
    let (label, text) = match &detail.data {
        DataView::Empty => return,
        DataView::Decoded(text) => ("Data:", text),
        DataView::Raw(text) => ("Data (raw):", text),
    };
    let _ = writeln!(out, "  {}", label);
    for line in text.lines() {
        let _ = writeln!(out, "    {}", line);
    }
}

/// Render a promise as labelled rows followed by param, value and tag sections.
pub fn render_detail(promise: &Promise, now: i64) -> String {
    let detail = PromiseDetail::from_promise(promise);
    let mut out = String::new();

    let rows = [
        ("ID", detail.id.clone()),
        ("State", detail.state.as_str().to_string()),
        ("Role", detail.role.as_str().to_string()),
        ("Timeout", format_timeout(detail.timeout)),
        ("Created", format_timestamp(detail.created_on, now)),
        ("Completed", format_timestamp(detail.completed_on, now)),
        ("Function", detail.function_name.clone().unwrap_or_else(|| "-".into())),
        ("Scope", detail.scope.clone().unwrap_or_else(|| "-".into())),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{:<10} {}", label, value);
    }

    render_value(&mut out, "Param", &detail.param);
    render_value(&mut out, "Value", &detail.value);

    let _ = writeln!(out);
    let _ = writeln!(out, "Tags");
    if detail.tags.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (k, v) in &detail.tags {
        // reserved tags are starred
        let mark = if k.starts_with(TAG_NAMESPACE) { '*' } else { ' ' };
        let _ = writeln!(out, "  {} {} = {}", mark, k, v);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{TAG_INVOKE, TAG_TIMEOUT};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::collections::HashMap;

    fn value(data: Option<&str>, headers: &[(&str, &str)]) -> Value {
        Value {
            headers: Some(
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>(),
            ),
            data: data.map(str::to_string),
        }
    }

    fn charge() -> Promise {
        let mut p = Promise {
            id: "order.1".to_string(),
            state: PromiseState::Resolved,
            timeout: 300_000,
            created_on: Some(1_000),
            completed_on: Some(4_000),
            param: Some(value(
                Some(&STANDARD.encode(r#"{"func":"charge"}"#)),
                &[("z-trace", "9"), ("a-id", "1")],
            )),
            value: Some(value(Some("not base64!"), &[])),
            ..Promise::default()
        };
        p.tags.insert(TAG_SCOPE.to_string(), "global".to_string());
        p.tags.insert(TAG_INVOKE.to_string(), "charge".to_string());
        p.tags.insert("customer".to_string(), "acme".to_string());
        p
    }

    #[test]
    fn test_format_timeout_units() {
        assert_eq!(format_timeout(0), "0s");
        assert_eq!(format_timeout(59_999), "59s");
        assert_eq!(format_timeout(300_000), "5m");
        assert_eq!(format_timeout(7_200_000), "2h");
        assert_eq!(format_timeout(3 * 86_400_000), "3d");
    }

    #[test]
    fn test_format_timestamp_with_age() {
        assert_eq!(format_timestamp(None, 0), "-");
        assert_eq!(
            format_timestamp(Some(0), 30_000),
            "1970-01-01 00:00:00 UTC (30s ago)"
        );
        assert_eq!(
            format_timestamp(Some(0), 7_200_000),
            "1970-01-01 00:00:00 UTC (2h ago)"
        );
        assert_eq!(
            format_timestamp(Some(0), 2 * 86_400_000),
            "1970-01-01 00:00:00 UTC"
        );
        // future timestamps carry no age
        assert_eq!(format_timestamp(Some(60_000), 0), "1970-01-01 00:01:00 UTC");
    }

    #[test]
    fn test_data_view_decodes_or_keeps_raw() {
        let encoded = value(Some(&STANDARD.encode("hello")), &[]);
        assert_eq!(DataView::of(&encoded), DataView::Decoded("hello".to_string()));

        let invalid = value(Some("not base64!"), &[]);
        assert_eq!(DataView::of(&invalid), DataView::Raw("not base64!".to_string()));

        assert_eq!(DataView::of(&value(Some(""), &[])), DataView::Empty);
        assert_eq!(DataView::of(&value(None, &[])), DataView::Empty);
    }

    #[test]
    fn test_detail_fields() {
        let detail = PromiseDetail::from_promise(&charge());
        assert_eq!(detail.role, Role::Rpc);
        assert_eq!(detail.function_name.as_deref(), Some("charge"));
        assert_eq!(detail.scope.as_deref(), Some("global"));
        let headers: Vec<&str> = detail.param.headers.keys().map(String::as_str).collect();
        assert_eq!(headers, vec!["a-id", "z-trace"]);
        assert_eq!(detail.value.data, DataView::Raw("not base64!".to_string()));
        assert_eq!(detail.tags.len(), 3);
    }

    #[test]
    fn test_render_detail() {
        let out = render_detail(&charge(), 10_000);
        assert!(out.contains("ID         order.1\n"));
        assert!(out.contains("Timeout    5m\n"));
        assert!(out.contains("Created    1970-01-01 00:00:01 UTC (9s ago)\n"));
        assert!(out.contains("Function   charge\n"));
        assert!(out.contains("Scope      global\n"));
        assert!(out.contains("    {\"func\":\"charge\"}\n"));
        assert!(out.contains("  Data (raw):\n    not base64!\n"));

        // headers and tags come out sorted, reserved tags starred
        let a = out.find("a-id: 1").unwrap();
        let z = out.find("z-trace: 9").unwrap();
        assert!(a < z);
        let customer = out.find("  customer = acme").unwrap();
        let invoke = out.find("* resonate:invoke = charge").unwrap();
        let scope = out.find("* resonate:scope = global").unwrap();
        assert!(customer < invoke && invoke < scope);
    }

    #[test]
    fn test_render_detail_empty_sections() {
        let mut p = Promise::placeholder("bare");
        p.tags.insert(TAG_TIMEOUT.to_string(), String::new());
        let out = render_detail(&p, 0);
        assert!(out.contains("Param\n  (empty)\n"));
        assert!(out.contains("Value\n  (empty)\n"));
        assert!(out.contains("Created    -\n"));
        assert!(out.contains("Function   -\n"));

        let untagged = render_detail(&Promise::placeholder("bare"), 0);
        assert!(untagged.contains("Tags\n  (none)\n"));
    }
}
