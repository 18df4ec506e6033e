use serde_json::Value;

use terminal_size::{terminal_size, Width};

/// Render a JSON value as an ASCII table when it has a tabular shape
/// (an array of objects or a single object). Returns `None` otherwise.
pub fn render_value(val: &Value, columns: Option<&[&str]>) -> Option<String> {
    let (cols, rows) = match val {
        Value::Array(arr) if arr.is_empty() => return None,
        Value::Array(arr) => table_from_array(arr, columns)?,
        Value::Object(map) => {
            let rows = map.iter().map(|(k, v)| vec![k.clone(), to_cell_string(v)]).collect();
            (vec!["field".to_string(), "value".to_string()], rows)
        }
        _ => return None,
    };
    let rows_count = rows.len();
    let mut out = render_table(&cols, &rows, terminal_width());
    if val.is_array() {
        out.push_str(&format!("rows: {rows_count}\n"));
    }
    Some(out)
}

// Columns are either the requested ones or the union of keys across all rows, sorted.
fn table_from_array(arr: &[Value], columns: Option<&[&str]>) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let cols: Vec<String> = match columns {
        Some(c) => c.iter().map(|s| s.to_string()).collect(),
        None => {
            let mut keys: Vec<String> = Vec::new();
            for el in arr {
                let map = el.as_object()?;
                for k in map.keys() {
                    if !keys.contains(k) { keys.push(k.clone()); }
                }
            }
            keys.sort();
            keys
        }
    };
    if cols.is_empty() { return None; }
    let rows = arr
        .iter()
        .map(|el| cols.iter().map(|c| el.get(c).map(to_cell_string).unwrap_or_default()).collect())
        .collect();
    Some((cols, rows))
}

/// Lay out `rows` under `cols`, capping each column and each line at `maxw`.
pub fn render_table(cols: &[String], rows: &[Vec<String>], maxw: usize) -> String {
    let mut widths: Vec<usize> = cols.iter().map(|s| display_len(s).min(maxw)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(maxw); }
        }
    }

    let sep = fit_line_to_width(&build_separator(&widths), maxw);
    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&fit_line_to_width(&build_row(cols, &widths), maxw));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for r in rows {
        out.push_str(&fit_line_to_width(&build_row(r, &widths), maxw));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn to_cell_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // keep objects/arrays compact
        other => other.to_string(),
    }
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(display_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if display_len(s) <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    // crude detection for aligning numbers to right
    let st = s.trim();
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}

fn terminal_width() -> usize {
    match terminal_size() {
        Some((Width(w), _)) if w > 20 => (w - 4) as usize,
        _ => 120,
    }
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    let len = display_len(s);
    if len <= maxw || maxw <= 3 { return s.to_string(); }
    let budget = maxw - 3;
    let front = budget / 2;
    let back = budget - front;
    let head: String = s.chars().take(front).collect();
    let tail: String = s.chars().skip(len - back).collect();
    format!("{head}...{tail}")
}
